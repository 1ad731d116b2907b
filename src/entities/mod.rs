// Entity Models - the ledger's records
//
// Each record type lives with its input types (create / partial update) and
// the validation those inputs need before they reach the database.

pub mod client;
pub mod purchase;
pub mod payment;
pub mod totals;

pub use client::{Client, ClientUpdate, NewClient};
pub use purchase::{NewPurchase, Purchase, PurchaseFilter, PurchaseStatus, PurchaseUpdate};
pub use payment::{NewPayment, Payment, PaymentUpdate};
pub use totals::Totals;
