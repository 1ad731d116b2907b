// 📒 Ledger - business rules over clients, purchases and payments
//
// Every operation that writes more than one row runs inside a single SQLite
// transaction, so a purchase and its first payment, or a deactivation and
// its cascade, land together or not at all.
//
// Purchase totals are never written directly: after any payment change the
// purchase is recomputed from its active payments (`totals::compute`).

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::db;
use crate::entities::{
    totals, Client, ClientUpdate, NewClient, NewPayment, NewPurchase, Payment, PaymentUpdate,
    Purchase, PurchaseFilter, PurchaseUpdate, Totals,
};
use crate::error::{messages, LedgerError, Result};
use crate::store::{clients, payments, purchases, Page};

pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Wrap a connection whose schema is already set up
    pub fn new(conn: Connection) -> Self {
        Ledger { conn }
    }

    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = db::open_database(path)?;
        db::setup_database(&conn)?;
        Ok(Ledger::new(conn))
    }

    /// In-memory ledger with a fresh schema
    pub fn in_memory() -> Result<Self> {
        Ok(Ledger::new(db::open_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========================================================================
    // CLIENTS
    // ========================================================================

    pub fn list_clients(&self, page: Page, only_active: bool) -> Result<Vec<Client>> {
        clients::list(&self.conn, page, only_active)
    }

    pub fn client(&self, id: i64) -> Result<Client> {
        clients::get(&self.conn, id)?.ok_or_else(|| LedgerError::not_found(messages::CLIENT_NOT_FOUND))
    }

    pub fn client_by_nickname(&self, nickname: &str) -> Result<Option<Client>> {
        clients::find_by_nickname(&self.conn, nickname)
    }

    pub fn create_client(&mut self, new: NewClient) -> Result<Client> {
        let new = new.normalized()?;
        let id = clients::insert(&self.conn, &new)?;
        info!(client_id = id, "client created");

        self.client(id)
    }

    pub fn update_client(&mut self, id: i64, update: ClientUpdate) -> Result<Client> {
        update.validate()?;
        self.client(id)?;

        clients::update(&self.conn, id, &update)?;
        debug!(client_id = id, "client updated");

        self.client(id)
    }

    /// Soft delete a client together with its purchases and their payments
    pub fn deactivate_client(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        if !clients::deactivate(&tx, id)? {
            return Err(LedgerError::not_found(messages::CLIENT_ALREADY_DISABLED));
        }

        let purchase_ids = purchases::ids_by_client(&tx, id)?;
        let purchases_closed = purchases::deactivate_by_client(&tx, id)?;
        let mut payments_closed = 0;
        for purchase_id in purchase_ids {
            payments_closed += payments::deactivate_by_purchase(&tx, purchase_id)?;
        }

        tx.commit()?;
        info!(
            client_id = id,
            purchases_closed, payments_closed, "client deactivated"
        );

        Ok(())
    }

    pub fn client_purchases(&self, client_id: i64, only_active: bool) -> Result<Vec<Purchase>> {
        self.client(client_id)?;
        purchases::list_by_client(&self.conn, client_id, only_active)
    }

    pub fn count_active_clients(&self) -> Result<i64> {
        clients::count_active(&self.conn)
    }

    // ========================================================================
    // PURCHASES
    // ========================================================================

    pub fn list_purchases(&self, page: Page, filter: PurchaseFilter) -> Result<Vec<Purchase>> {
        purchases::list(&self.conn, page, filter)
    }

    pub fn purchase(&self, id: i64) -> Result<Purchase> {
        purchases::get(&self.conn, id)?
            .ok_or_else(|| LedgerError::not_found(messages::PURCHASE_NOT_FOUND))
    }

    pub fn purchase_by_note(&self, note_number: &str) -> Result<Purchase> {
        purchases::find_by_note(&self.conn, note_number)?
            .ok_or_else(|| LedgerError::not_found(messages::PURCHASE_NOT_FOUND))
    }

    /// Register a purchase, optionally with its first payment
    pub fn create_purchase(&mut self, client_id: i64, new: NewPurchase) -> Result<Purchase> {
        new.validate()?;

        let tx = self.conn.transaction()?;

        ensure_active_client(&tx, client_id)?;

        let note_number = new
            .note_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let id = purchases::insert(
            &tx,
            client_id,
            new.description.trim(),
            new.total_value,
            note_number,
        )?;

        if let Some(payment) = &new.payment {
            payments::insert(&tx, id, payment)?;
            recalculate(&tx, id)?;
        }

        tx.commit()?;
        info!(purchase_id = id, client_id, "purchase created");

        self.purchase(id)
    }

    pub fn update_purchase(&mut self, id: i64, update: PurchaseUpdate) -> Result<Purchase> {
        update.validate()?;

        let tx = self.conn.transaction()?;

        if purchases::get(&tx, id)?.is_none() {
            return Err(LedgerError::not_found(messages::PURCHASE_NOT_FOUND));
        }
        if let Some(client_id) = update.client_id {
            ensure_active_client(&tx, client_id)?;
        }

        purchases::update(&tx, id, &update)?;
        if update.affects_totals() {
            recalculate(&tx, id)?;
        }

        tx.commit()?;
        debug!(purchase_id = id, "purchase updated");

        self.purchase(id)
    }

    /// Reactivate a purchase; totals are recomputed from its active payments
    pub fn activate_purchase(&mut self, id: i64) -> Result<Purchase> {
        let tx = self.conn.transaction()?;

        let purchase = purchases::get(&tx, id)?
            .ok_or_else(|| LedgerError::not_found(messages::PURCHASE_NOT_FOUND))?;
        if purchase.is_active {
            return Err(LedgerError::business(messages::PURCHASE_ALREADY_ENABLED));
        }

        purchases::set_active(&tx, id, true)?;
        recalculate(&tx, id)?;

        tx.commit()?;
        info!(purchase_id = id, "purchase activated");

        self.purchase(id)
    }

    /// Soft delete a purchase and its payments
    pub fn deactivate_purchase(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        let purchase = purchases::get(&tx, id)?
            .ok_or_else(|| LedgerError::not_found(messages::PURCHASE_NOT_FOUND))?;
        if !purchase.is_active {
            return Err(LedgerError::business(messages::PURCHASE_ALREADY_DISABLED));
        }

        purchases::set_active(&tx, id, false)?;
        let payments_closed = payments::deactivate_by_purchase(&tx, id)?;
        purchases::set_totals(&tx, id, Totals::unpaid())?;

        tx.commit()?;
        info!(purchase_id = id, payments_closed, "purchase deactivated");

        Ok(())
    }

    pub fn outstanding_total(&self) -> Result<f64> {
        purchases::outstanding_total(&self.conn)
    }

    // ========================================================================
    // PAYMENTS
    // ========================================================================

    pub fn list_payments(&self, page: Page) -> Result<Vec<Payment>> {
        payments::list(&self.conn, page)
    }

    pub fn payment(&self, id: i64) -> Result<Payment> {
        payments::get(&self.conn, id)?
            .ok_or_else(|| LedgerError::not_found(messages::PAYMENT_NOT_FOUND))
    }

    pub fn purchase_payments(&self, purchase_id: i64, page: Page) -> Result<Vec<Payment>> {
        self.purchase(purchase_id)?;
        payments::list_by_purchase(&self.conn, purchase_id, page)
    }

    pub fn create_payment(&mut self, purchase_id: i64, new: NewPayment) -> Result<Payment> {
        new.validate()?;

        let tx = self.conn.transaction()?;

        match purchases::get(&tx, purchase_id)? {
            Some(purchase) if purchase.is_active => {}
            _ => return Err(LedgerError::business(messages::PAYMENT_CREATION_FAILED)),
        }

        let id = payments::insert(&tx, purchase_id, &new)?;
        recalculate(&tx, purchase_id)?;

        tx.commit()?;
        info!(payment_id = id, purchase_id, amount = new.amount, "payment registered");

        self.payment(id)
    }

    pub fn update_payment(
        &mut self,
        purchase_id: i64,
        payment_id: i64,
        update: PaymentUpdate,
    ) -> Result<Payment> {
        update.validate()?;

        let tx = self.conn.transaction()?;

        linked_payment(&tx, purchase_id, payment_id)?;
        payments::update(&tx, payment_id, &update)?;
        recalculate(&tx, purchase_id)?;

        tx.commit()?;
        debug!(payment_id, purchase_id, "payment updated");

        self.payment(payment_id)
    }

    pub fn activate_payment(&mut self, purchase_id: i64, payment_id: i64) -> Result<Payment> {
        let tx = self.conn.transaction()?;

        if purchases::get(&tx, purchase_id)?.is_none() {
            return Err(LedgerError::not_found(messages::PURCHASE_NOT_FOUND));
        }
        let payment = linked_payment(&tx, purchase_id, payment_id)?;
        if payment.is_active {
            return Err(LedgerError::business(messages::PAYMENT_ALREADY_ENABLED));
        }

        payments::set_active(&tx, payment_id, true)?;
        recalculate(&tx, purchase_id)?;

        tx.commit()?;
        info!(payment_id, purchase_id, "payment activated");

        self.payment(payment_id)
    }

    pub fn deactivate_payment(&mut self, purchase_id: i64, payment_id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        let payment = linked_payment(&tx, purchase_id, payment_id)?;
        if !payment.is_active {
            return Err(LedgerError::business(messages::PAYMENT_ALREADY_DISABLED));
        }

        payments::set_active(&tx, payment_id, false)?;
        recalculate(&tx, purchase_id)?;

        tx.commit()?;
        info!(payment_id, purchase_id, "payment deactivated");

        Ok(())
    }

    // ========================================================================
    // RECENT ACTIVITY
    // ========================================================================

    /// Latest active clients, newest first
    pub fn recent_clients(&self, limit: u32) -> Result<Vec<Client>> {
        clients::list(&self.conn, Page::first(limit), true)
    }

    pub fn recent_purchases(&self, limit: u32) -> Result<Vec<Purchase>> {
        purchases::list(&self.conn, Page::first(limit), PurchaseFilter::Active)
    }

    pub fn recent_payments(&self, limit: u32) -> Result<Vec<Payment>> {
        payments::list(&self.conn, Page::first(limit))
    }
}

/// Fetch a payment and check it belongs to `purchase_id`
fn linked_payment(conn: &Connection, purchase_id: i64, payment_id: i64) -> Result<Payment> {
    let payment = payments::get(conn, payment_id)?
        .ok_or_else(|| LedgerError::not_found(messages::PAYMENT_NOT_FOUND))?;

    if payment.purchase_id != purchase_id {
        return Err(LedgerError::business(messages::PAYMENT_NOT_LINKED));
    }
    Ok(payment)
}

/// Purchases may only be attached to an active client
fn ensure_active_client(conn: &Connection, client_id: i64) -> Result<()> {
    match clients::get(conn, client_id)? {
        Some(client) if client.is_active => Ok(()),
        _ => Err(LedgerError::business(messages::PURCHASE_CLIENT_NOT_FOUND)),
    }
}

/// Recompute an active purchase's totals from its active payments
fn recalculate(conn: &Connection, purchase_id: i64) -> Result<Option<Totals>> {
    let purchase = match purchases::get(conn, purchase_id)? {
        Some(p) if p.is_active => p,
        _ => return Ok(None),
    };

    let all = payments::list_by_purchase(conn, purchase_id, Page::all())?;
    let totals = totals::compute(purchase.total_value, &all);
    purchases::set_totals(conn, purchase_id, totals)?;

    debug!(
        purchase_id,
        paid = totals.total_paid_value,
        status = %totals.status,
        "purchase totals recalculated"
    );
    Ok(Some(totals))
}
