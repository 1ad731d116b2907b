// Agroreal - Core Library
// Store ledger (clients → purchases → payments) shared by the CLI, the
// terminal dashboard and the API server

pub mod error;
pub mod db;
pub mod entities;
pub mod store;
pub mod ledger;
pub mod currency;       // Money formatting
pub mod registry_card;  // Dashboard card view-model
pub mod navigation;     // Router seam + in-process history
pub mod dashboard;
pub mod import;         // CSV → ledger
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{LedgerError, Result};
pub use db::{open_database, open_in_memory, setup_database};
pub use entities::{
    Client, ClientUpdate, NewClient,
    Purchase, PurchaseFilter, PurchaseStatus, PurchaseUpdate, NewPurchase,
    Payment, PaymentUpdate, NewPayment,
    Totals,
};
pub use store::Page;
pub use ledger::Ledger;
pub use currency::{
    format_brl, format_currency, CurrencyFormatter, FormatError,
    DEFAULT_CURRENCY, DEFAULT_LOCALE,
};
pub use registry_card::{
    CardError, ColorToken, DisplayValue, Palette, RegistryCard, RegistryEntry, RegistryId,
};
pub use navigation::{HistoryRouter, NavigationError, Navigator, Router};
pub use dashboard::build_dashboard;
pub use import::{import_rows, load_csv, load_rows, ImportRow, ImportSummary};
pub use config::{Config, ConfigError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
