// Ledger errors - one enum for the whole service layer
//
// Four kinds, matching how callers react to them:
// - NotFound      → the resource does not exist
// - Validation    → the request itself is malformed
// - BusinessRule  → the request is well formed but conflicts with stored data
// - Database      → anything unexpected from SQLite
//
// Io / Csv / Card only surface from the CLI import and the dashboard builder.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid card: {0}")]
    Card(#[from] crate::registry_card::CardError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn not_found(message: &str) -> Self {
        LedgerError::NotFound(message.to_string())
    }

    pub fn validation(message: &str) -> Self {
        LedgerError::Validation(message.to_string())
    }

    pub fn business(message: &str) -> Self {
        LedgerError::BusinessRule(message.to_string())
    }
}

// ============================================================================
// CONSTRAINT VIOLATIONS
// ============================================================================

/// Which SQLite constraint rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Unique,
    ForeignKey,
}

/// Classify a rusqlite error as a constraint violation, if it is one
pub fn constraint_violation(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Constraint::Unique)
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Map constraint violations on a write to business-rule errors
///
/// `on_unique` / `on_foreign_key` are the messages shown to the caller.
pub fn map_constraint(err: rusqlite::Error, on_unique: &str, on_foreign_key: &str) -> LedgerError {
    match constraint_violation(&err) {
        Some(Constraint::Unique) => LedgerError::business(on_unique),
        Some(Constraint::ForeignKey) => LedgerError::business(on_foreign_key),
        None => LedgerError::Database(err),
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

pub mod messages {
    // Clients
    pub const CLIENT_NOT_FOUND: &str = "Client not found.";
    pub const CLIENT_ALREADY_EXISTS: &str = "A client with this nickname already exists.";
    pub const CLIENT_INVALID_NAME: &str = "Invalid name. Avoid numbers and symbols.";
    pub const CLIENT_INVALID_EMAIL: &str = "Invalid email address.";
    pub const CLIENT_ALREADY_DISABLED: &str = "Client not found or already deactivated.";

    // Purchases
    pub const PURCHASE_NOT_FOUND: &str = "Purchase not found.";
    pub const PURCHASE_ALREADY_EXISTS: &str = "A purchase with this note number already exists.";
    pub const PURCHASE_INVALID_TOTAL: &str = "The purchase total must be greater than zero.";
    pub const PURCHASE_INVALID_DESCRIPTION: &str = "The purchase description must not be empty.";
    pub const PURCHASE_CLIENT_NOT_FOUND: &str = "No client exists with this id.";
    pub const PURCHASE_ALREADY_ENABLED: &str = "Purchase is already active.";
    pub const PURCHASE_ALREADY_DISABLED: &str = "Purchase is already deactivated.";

    // Payments
    pub const PAYMENT_NOT_FOUND: &str = "Payment not found.";
    pub const PAYMENT_ALREADY_EXISTS: &str = "A payment with this receipt number already exists.";
    pub const PAYMENT_INVALID_AMOUNT: &str = "The payment amount must be greater than zero.";
    pub const PAYMENT_INVALID_METHOD: &str = "The payment method must not be empty.";
    pub const PAYMENT_PURCHASE_NOT_FOUND: &str = "No purchase exists with this id.";
    pub const PAYMENT_NOT_LINKED: &str = "Payment does not belong to the given purchase.";
    pub const PAYMENT_ALREADY_ENABLED: &str = "Payment is already active.";
    pub const PAYMENT_ALREADY_DISABLED: &str = "Payment is already deactivated.";
    pub const PAYMENT_CREATION_FAILED: &str = "Cannot add a payment to a deactivated purchase.";

    // Generic
    pub const DATA_FIELDS_EMPTY: &str = "No valid field was provided to update the resource.";
}
