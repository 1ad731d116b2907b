use rusqlite::{params, Connection, OptionalExtension, Row};

use super::Page;
use crate::db::{from_seconds, now_seconds};
use crate::entities::{Client, ClientUpdate, NewClient};
use crate::error::{map_constraint, messages, Result};

const COLUMNS: &str = "id, name, nickname, phone, email, is_active, created_at, updated_at";

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        nickname: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        is_active: row.get(5)?,
        created_at: from_seconds(row.get(6)?),
        updated_at: from_seconds(row.get(7)?),
    })
}

fn on_write_error(err: rusqlite::Error) -> crate::error::LedgerError {
    map_constraint(err, messages::CLIENT_ALREADY_EXISTS, messages::CLIENT_NOT_FOUND)
}

pub fn insert(conn: &Connection, client: &NewClient) -> Result<i64> {
    let now = now_seconds();

    conn.execute(
        "INSERT INTO clients (name, nickname, phone, email, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
        params![client.name, client.nickname, client.phone, client.email, now],
    )
    .map_err(on_write_error)?;

    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Client>> {
    let sql = format!("SELECT {} FROM clients WHERE id = ?1", COLUMNS);
    let client = conn.query_row(&sql, [id], client_from_row).optional()?;

    Ok(client)
}

pub fn find_by_nickname(conn: &Connection, nickname: &str) -> Result<Option<Client>> {
    let sql = format!("SELECT {} FROM clients WHERE nickname = ?1", COLUMNS);
    let client = conn
        .query_row(&sql, [nickname], client_from_row)
        .optional()?;

    Ok(client)
}

/// Newest first
pub fn list(conn: &Connection, page: Page, only_active: bool) -> Result<Vec<Client>> {
    let filter = if only_active { "WHERE is_active = 1" } else { "" };
    let sql = format!(
        "SELECT {} FROM clients {} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        COLUMNS, filter
    );

    let mut stmt = conn.prepare(&sql)?;
    let clients = stmt
        .query_map(params![page.sql_limit(), page.sql_offset()], client_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(clients)
}

pub fn count_active(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE is_active = 1",
        [],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Apply the set fields of `update`; returns whether a row changed.
/// A blank nickname or phone clears the column.
pub fn update(conn: &Connection, id: i64, update: &ClientUpdate) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE clients SET
                name = COALESCE(?1, name),
                nickname = CASE WHEN ?2 IS NULL THEN nickname ELSE NULLIF(?2, '') END,
                phone = CASE WHEN ?3 IS NULL THEN phone ELSE NULLIF(?3, '') END,
                email = COALESCE(?4, email),
                updated_at = ?5
             WHERE id = ?6",
            params![
                update.name.as_deref().map(str::trim),
                update.nickname.as_deref().map(str::trim),
                update.phone.as_deref().map(str::trim),
                update.email.as_deref().map(str::trim),
                now_seconds(),
                id
            ],
        )
        .map_err(on_write_error)?;

    Ok(changed > 0)
}

/// Soft delete; `false` when the client is missing or already inactive
pub fn deactivate(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE clients SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![now_seconds(), id],
    )?;

    Ok(changed > 0)
}
