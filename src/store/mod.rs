// Store - SQL for each table
//
// Functions take a `&Connection` so they work both on a plain connection and
// inside a `rusqlite::Transaction`. They know nothing about business rules;
// `ledger.rs` decides what may be written.

pub mod clients;
pub mod purchases;
pub mod payments;

use rusqlite::Connection;
use serde::Deserialize;

use crate::error::Result;

/// `limit` / `offset` for listings (no limit when `limit` is `None`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Page {
            limit: Some(limit),
            offset: 0,
        }
    }

    pub fn all() -> Self {
        Page::default()
    }

    /// SQLite reads a negative LIMIT as "no limit"
    pub(crate) fn sql_limit(&self) -> i64 {
        self.limit.map(i64::from).unwrap_or(-1)
    }

    pub(crate) fn sql_offset(&self) -> i64 {
        i64::from(self.offset)
    }
}

/// Render `NF-0001` style document numbers
pub(crate) fn document_number(prefix: &str, id: i64) -> String {
    format!("{}-{:04}", prefix, id)
}

/// First `PREFIX-<n>` with `n >= id` not already stored in `table.column`.
/// Caller-chosen numbers may occupy the one matching the row id.
pub(crate) fn free_document_number(
    conn: &Connection,
    table: &str,
    column: &str,
    prefix: &str,
    id: i64,
) -> Result<String> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", table, column);
    let mut stmt = conn.prepare(&sql)?;

    let mut n = id;
    loop {
        let candidate = document_number(prefix, n);
        let taken: bool = stmt.query_row([&candidate], |row| row.get(0))?;
        if !taken {
            return Ok(candidate);
        }
        n += 1;
    }
}
