use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{document_number, free_document_number, Page};
use crate::db::{from_seconds, now_seconds};
use crate::entities::{NewPayment, Payment, PaymentUpdate};
use crate::error::{map_constraint, messages, LedgerError, Result};

const COLUMNS: &str = "id, purchase_id, amount, payment_date, method, description, \
                       receipt_number, is_active, created_at, updated_at";

pub const RECEIPT_PREFIX: &str = "REC";

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    let id: i64 = row.get(0)?;
    let payment_date: Option<i64> = row.get(3)?;
    let receipt_number: Option<String> = row.get(6)?;

    Ok(Payment {
        id,
        purchase_id: row.get(1)?,
        amount: row.get(2)?,
        payment_date: payment_date.map(from_seconds),
        method: row.get(4)?,
        description: row.get(5)?,
        receipt_number: receipt_number.unwrap_or_else(|| document_number(RECEIPT_PREFIX, id)),
        is_active: row.get(7)?,
        created_at: from_seconds(row.get(8)?),
        updated_at: from_seconds(row.get(9)?),
    })
}

fn on_write_error(err: rusqlite::Error) -> LedgerError {
    map_constraint(
        err,
        messages::PAYMENT_ALREADY_EXISTS,
        messages::PAYMENT_PURCHASE_NOT_FOUND,
    )
}

/// Insert a payment; a missing receipt number becomes `REC-<id>`, or the next
/// free `REC-` number when that one was chosen by hand
pub fn insert(conn: &Connection, purchase_id: i64, payment: &NewPayment) -> Result<i64> {
    let now = now_seconds();
    let receipt = payment.normalized_receipt();

    conn.execute(
        "INSERT INTO payments (
            purchase_id, amount, payment_date, method, description,
            receipt_number, is_active, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
        params![
            purchase_id,
            payment.amount,
            payment.payment_date,
            payment.method.trim(),
            payment.normalized_description(),
            receipt,
            now
        ],
    )
    .map_err(on_write_error)?;

    let id = conn.last_insert_rowid();
    if receipt.is_none() {
        let receipt = free_document_number(conn, "payments", "receipt_number", RECEIPT_PREFIX, id)?;
        conn.execute(
            "UPDATE payments SET receipt_number = ?1 WHERE id = ?2",
            params![receipt, id],
        )
        .map_err(on_write_error)?;
    }

    Ok(id)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Payment>> {
    let sql = format!("SELECT {} FROM payments WHERE id = ?1", COLUMNS);
    let payment = conn.query_row(&sql, [id], payment_from_row).optional()?;

    Ok(payment)
}

/// Active payments, newest first
pub fn list(conn: &Connection, page: Page) -> Result<Vec<Payment>> {
    let sql = format!(
        "SELECT {} FROM payments WHERE is_active = 1
         ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let payments = stmt
        .query_map(params![page.sql_limit(), page.sql_offset()], payment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(payments)
}

/// Every payment of one purchase, active or not, newest first
pub fn list_by_purchase(conn: &Connection, purchase_id: i64, page: Page) -> Result<Vec<Payment>> {
    let sql = format!(
        "SELECT {} FROM payments WHERE purchase_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
        COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let payments = stmt
        .query_map(
            params![purchase_id, page.sql_limit(), page.sql_offset()],
            payment_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(payments)
}

pub fn update(conn: &Connection, id: i64, update: &PaymentUpdate) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE payments SET
                amount = COALESCE(?1, amount),
                payment_date = COALESCE(?2, payment_date),
                method = COALESCE(?3, method),
                description = COALESCE(?4, description),
                updated_at = ?5
             WHERE id = ?6",
            params![
                update.amount,
                update.payment_date,
                update.method.as_deref().map(str::trim),
                update.description.as_deref().map(str::trim),
                now_seconds(),
                id
            ],
        )
        .map_err(on_write_error)?;

    Ok(changed > 0)
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET is_active = ?1, updated_at = ?2 WHERE id = ?3 AND is_active = ?4",
        params![active, now_seconds(), id, !active],
    )?;

    Ok(changed > 0)
}

pub fn deactivate_by_purchase(conn: &Connection, purchase_id: i64) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE payments SET is_active = 0, updated_at = ?1 WHERE purchase_id = ?2 AND is_active = 1",
        params![now_seconds(), purchase_id],
    )?;

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::entities::NewClient;
    use crate::store::{clients, purchases};

    fn purchase(conn: &Connection) -> i64 {
        let client_id = clients::insert(conn, &NewClient::new("Ana")).unwrap();
        purchases::insert(conn, client_id, "Seeds", 100.0, None).unwrap()
    }

    #[test]
    fn test_insert_assigns_receipt() {
        let conn = open_in_memory().unwrap();
        let purchase_id = purchase(&conn);

        let id = insert(&conn, purchase_id, &NewPayment::new(50.0, " pix ")).unwrap();
        let payment = get(&conn, id).unwrap().unwrap();

        assert_eq!(payment.receipt_number, document_number(RECEIPT_PREFIX, id));
        assert_eq!(payment.method, "pix");
        assert_eq!(payment.payment_date, None);
    }

    #[test]
    fn test_duplicate_receipt_and_missing_purchase() {
        let conn = open_in_memory().unwrap();
        let purchase_id = purchase(&conn);
        let payment = NewPayment::new(10.0, "cash").with_receipt_number("REC-0100");
        insert(&conn, purchase_id, &payment).unwrap();

        let err = insert(&conn, purchase_id, &payment).unwrap_err();
        assert!(matches!(err, LedgerError::BusinessRule(ref m) if m == messages::PAYMENT_ALREADY_EXISTS));

        let err = insert(&conn, purchase_id + 10, &NewPayment::new(10.0, "cash")).unwrap_err();
        assert!(matches!(err, LedgerError::BusinessRule(ref m) if m == messages::PAYMENT_PURCHASE_NOT_FOUND));
    }

    #[test]
    fn test_listing_by_purchase_includes_inactive() {
        let conn = open_in_memory().unwrap();
        let purchase_id = purchase(&conn);
        let first = insert(&conn, purchase_id, &NewPayment::new(10.0, "cash")).unwrap();
        let second = insert(&conn, purchase_id, &NewPayment::new(20.0, "pix")).unwrap();
        set_active(&conn, first, false).unwrap();

        let all: Vec<i64> = list_by_purchase(&conn, purchase_id, Page::all())
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, vec![second, first]);

        let active = list(&conn, Page::all()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second);
    }

    #[test]
    fn test_deactivate_by_purchase() {
        let conn = open_in_memory().unwrap();
        let purchase_id = purchase(&conn);
        insert(&conn, purchase_id, &NewPayment::new(10.0, "cash")).unwrap();
        insert(&conn, purchase_id, &NewPayment::new(20.0, "pix")).unwrap();

        assert_eq!(deactivate_by_purchase(&conn, purchase_id).unwrap(), 2);
        assert_eq!(deactivate_by_purchase(&conn, purchase_id).unwrap(), 0);
    }
}
