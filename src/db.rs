// 🗄️ Database - SQLite connection setup and schema
//
// Three tables: clients → purchases → payments. Rows are soft-deleted via
// `is_active`; timestamps are unix seconds.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;

/// Open (creating if needed) the database file and apply connection pragmas
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    configure_connection(&conn)?;
    info!(path = %path.display(), "database opened");

    Ok(conn)
}

/// Per-connection pragmas
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // Reference integrity
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // Negative value = KiB → 4 MB
    conn.pragma_update(None, "cache_size", -4000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "mmap_size", 50_000_000)?;

    conn.busy_timeout(Duration::from_secs(5))?;

    debug!("connection pragmas applied");
    Ok(())
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Clients
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            nickname TEXT UNIQUE,
            phone TEXT,
            email TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Purchases
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS purchases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            total_value REAL NOT NULL,
            total_paid_value REAL NOT NULL DEFAULT 0.0,
            status TEXT NOT NULL DEFAULT 'pending',
            note_number TEXT UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            FOREIGN KEY (client_id) REFERENCES clients (id)
        )",
        [],
    )?;

    // ==========================================================================
    // Payments
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            payment_date INTEGER,
            method TEXT NOT NULL,
            description TEXT,
            receipt_number TEXT UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            FOREIGN KEY (purchase_id) REFERENCES purchases (id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clients_name ON clients(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_purchases_client ON purchases(client_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_purchase ON payments(purchase_id)",
        [],
    )?;

    Ok(())
}

/// In-memory database with schema, for tests and dry runs
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;

    Ok(count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Clients,
    Purchases,
    Payments,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Purchases => "purchases",
            Table::Payments => "payments",
        }
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

pub fn now_seconds() -> i64 {
    Utc::now().timestamp()
}

pub fn from_seconds(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}
