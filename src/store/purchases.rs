use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{document_number, free_document_number, Page};
use crate::db::{from_seconds, now_seconds};
use crate::entities::{Purchase, PurchaseFilter, PurchaseUpdate, Totals};
use crate::error::{map_constraint, messages, LedgerError, Result};

const COLUMNS: &str = "id, client_id, description, total_value, total_paid_value, status, \
                       note_number, is_active, created_at, updated_at";

pub const NOTE_PREFIX: &str = "NF";

fn purchase_from_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    let id: i64 = row.get(0)?;
    let note_number: Option<String> = row.get(6)?;

    Ok(Purchase {
        id,
        client_id: row.get(1)?,
        description: row.get(2)?,
        total_value: row.get(3)?,
        total_paid_value: row.get(4)?,
        status: row.get(5)?,
        note_number: note_number.unwrap_or_else(|| document_number(NOTE_PREFIX, id)),
        is_active: row.get(7)?,
        created_at: from_seconds(row.get(8)?),
        updated_at: from_seconds(row.get(9)?),
    })
}

fn on_write_error(err: rusqlite::Error) -> LedgerError {
    map_constraint(
        err,
        messages::PURCHASE_ALREADY_EXISTS,
        messages::PURCHASE_CLIENT_NOT_FOUND,
    )
}

/// Insert an unpaid purchase; a missing note number becomes `NF-<id>`, or the
/// next free `NF-` number when that one was chosen by hand
pub fn insert(
    conn: &Connection,
    client_id: i64,
    description: &str,
    total_value: f64,
    note_number: Option<&str>,
) -> Result<i64> {
    let now = now_seconds();
    let unpaid = Totals::unpaid();

    conn.execute(
        "INSERT INTO purchases (
            client_id, description, total_value, total_paid_value, status,
            note_number, is_active, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
        params![
            client_id,
            description,
            total_value,
            unpaid.total_paid_value,
            unpaid.status,
            note_number,
            now
        ],
    )
    .map_err(on_write_error)?;

    let id = conn.last_insert_rowid();
    if note_number.is_none() {
        let note = free_document_number(conn, "purchases", "note_number", NOTE_PREFIX, id)?;
        conn.execute(
            "UPDATE purchases SET note_number = ?1 WHERE id = ?2",
            params![note, id],
        )
        .map_err(on_write_error)?;
    }

    Ok(id)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Purchase>> {
    let sql = format!("SELECT {} FROM purchases WHERE id = ?1", COLUMNS);
    let purchase = conn.query_row(&sql, [id], purchase_from_row).optional()?;

    Ok(purchase)
}

pub fn find_by_note(conn: &Connection, note_number: &str) -> Result<Option<Purchase>> {
    let sql = format!("SELECT {} FROM purchases WHERE note_number = ?1", COLUMNS);
    let purchase = conn
        .query_row(&sql, [note_number], purchase_from_row)
        .optional()?;

    Ok(purchase)
}

/// Newest first
pub fn list(conn: &Connection, page: Page, filter: PurchaseFilter) -> Result<Vec<Purchase>> {
    let filter = match filter {
        PurchaseFilter::All => "",
        PurchaseFilter::Active => "WHERE is_active = 1",
        PurchaseFilter::Outstanding => "WHERE status IN ('pending', 'partial') AND is_active = 1",
    };
    let sql = format!(
        "SELECT {} FROM purchases {} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        COLUMNS, filter
    );

    let mut stmt = conn.prepare(&sql)?;
    let purchases = stmt
        .query_map(params![page.sql_limit(), page.sql_offset()], purchase_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(purchases)
}

pub fn list_by_client(conn: &Connection, client_id: i64, only_active: bool) -> Result<Vec<Purchase>> {
    let filter = if only_active { "AND is_active = 1" } else { "" };
    let sql = format!(
        "SELECT {} FROM purchases WHERE client_id = ?1 {} ORDER BY created_at DESC, id DESC",
        COLUMNS, filter
    );

    let mut stmt = conn.prepare(&sql)?;
    let purchases = stmt
        .query_map([client_id], purchase_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(purchases)
}

pub fn ids_by_client(conn: &Connection, client_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM purchases WHERE client_id = ?1")?;
    let ids = stmt
        .query_map([client_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    Ok(ids)
}

/// Outstanding balance over active purchases
pub fn outstanding_total(conn: &Connection) -> Result<f64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(MAX(total_value - total_paid_value, 0)), 0.0)
         FROM purchases WHERE is_active = 1",
        [],
        |row| row.get(0),
    )?;

    Ok(total)
}

pub fn update(conn: &Connection, id: i64, update: &PurchaseUpdate) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE purchases SET
                description = COALESCE(?1, description),
                total_value = COALESCE(?2, total_value),
                client_id = COALESCE(?3, client_id),
                updated_at = ?4
             WHERE id = ?5",
            params![
                update.description.as_deref().map(str::trim),
                update.total_value,
                update.client_id,
                now_seconds(),
                id
            ],
        )
        .map_err(on_write_error)?;

    Ok(changed > 0)
}

pub fn set_totals(conn: &Connection, id: i64, totals: Totals) -> Result<()> {
    conn.execute(
        "UPDATE purchases SET total_paid_value = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
        params![totals.total_paid_value, totals.status, now_seconds(), id],
    )?;

    Ok(())
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE purchases SET is_active = ?1, updated_at = ?2 WHERE id = ?3 AND is_active = ?4",
        params![active, now_seconds(), id, !active],
    )?;

    Ok(changed > 0)
}

/// Soft delete every purchase of a client and reset their totals
pub fn deactivate_by_client(conn: &Connection, client_id: i64) -> Result<usize> {
    let unpaid = Totals::unpaid();
    let changed = conn.execute(
        "UPDATE purchases SET is_active = 0, total_paid_value = ?1, status = ?2, updated_at = ?3
         WHERE client_id = ?4 AND is_active = 1",
        params![unpaid.total_paid_value, unpaid.status, now_seconds(), client_id],
    )?;

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::entities::{NewClient, PurchaseStatus};
    use crate::store::clients;

    fn client(conn: &Connection) -> i64 {
        clients::insert(conn, &NewClient::new("Ana")).unwrap()
    }

    #[test]
    fn test_insert_assigns_note_number() {
        let conn = open_in_memory().unwrap();
        let client_id = client(&conn);

        let id = insert(&conn, client_id, "Seeds", 100.0, None).unwrap();
        let purchase = get(&conn, id).unwrap().unwrap();

        assert_eq!(purchase.note_number, document_number(NOTE_PREFIX, id));
        assert_eq!(purchase.status, PurchaseStatus::Pending);
        assert_eq!(purchase.total_paid_value, 0.0);
        assert_eq!(find_by_note(&conn, &purchase.note_number).unwrap().unwrap().id, id);
    }

    #[test]
    fn test_unknown_client_is_business_error() {
        let conn = open_in_memory().unwrap();
        let err = insert(&conn, 42, "Seeds", 100.0, None).unwrap_err();

        assert!(matches!(err, LedgerError::BusinessRule(ref m) if m == messages::PURCHASE_CLIENT_NOT_FOUND));
    }

    #[test]
    fn test_duplicate_note_number() {
        let conn = open_in_memory().unwrap();
        let client_id = client(&conn);
        insert(&conn, client_id, "Seeds", 100.0, Some("NF-9000")).unwrap();

        let err = insert(&conn, client_id, "Tools", 50.0, Some("NF-9000")).unwrap_err();
        assert!(matches!(err, LedgerError::BusinessRule(ref m) if m == messages::PURCHASE_ALREADY_EXISTS));
    }

    #[test]
    fn test_outstanding_filter_and_total() {
        let conn = open_in_memory().unwrap();
        let client_id = client(&conn);
        let paid = insert(&conn, client_id, "Tools", 300.0, None).unwrap();
        let partial = insert(&conn, client_id, "Seeds", 100.0, None).unwrap();
        let _pending = insert(&conn, client_id, "Fertilizer", 200.0, None).unwrap();

        set_totals(&conn, paid, Totals { total_paid_value: 300.0, status: PurchaseStatus::Paid }).unwrap();
        set_totals(&conn, partial, Totals { total_paid_value: 50.0, status: PurchaseStatus::Partial }).unwrap();

        let outstanding = list(&conn, Page::all(), PurchaseFilter::Outstanding).unwrap();
        assert_eq!(outstanding.len(), 2);
        assert!(outstanding.iter().all(|p| p.status.is_outstanding()));

        assert_eq!(outstanding_total(&conn).unwrap(), 250.0);
    }

    #[test]
    fn test_set_active_only_flips_once() {
        let conn = open_in_memory().unwrap();
        let id = insert(&conn, client(&conn), "Seeds", 10.0, None).unwrap();

        assert!(set_active(&conn, id, false).unwrap());
        assert!(!set_active(&conn, id, false).unwrap());
        assert!(set_active(&conn, id, true).unwrap());

        assert_eq!(list(&conn, Page::all(), PurchaseFilter::All).unwrap().len(), 1);
    }
}
