// 📥 Import - load clients, purchases and payments from CSV
//
// One row per purchase. Clients are matched by nickname and created on first
// sight. A row whose note number is already stored adds its amount as an extra
// payment on that purchase. A payment row without a receipt number gets
// `<note>-L<line>` as its receipt, so re-running the same file counts stored
// rows as duplicates instead of paying twice. Rows without a note number have
// nothing to match on and create a new purchase every run.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::entities::{NewClient, NewPayment, NewPurchase};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportRow {
    pub client_name: String,
    pub client_nickname: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    /// Empty together with `total_value` for a client-only row
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub note_number: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

impl ImportRow {
    fn new_client(&self) -> NewClient {
        NewClient {
            name: self.client_name.clone(),
            nickname: Some(self.client_nickname.clone()),
            phone: self.client_phone.clone(),
            email: self.client_email.clone(),
        }
    }

    /// The row's payment, if it carries a positive amount
    fn new_payment(&self, line: usize) -> Option<NewPayment> {
        let amount = self.amount.filter(|a| *a > 0.0)?;

        Some(NewPayment {
            amount,
            method: self.method.clone().unwrap_or_default(),
            payment_date: None,
            description: None,
            receipt_number: self.receipt_key(line),
        })
    }

    fn receipt_key(&self, line: usize) -> Option<String> {
        let given = self
            .receipt_number
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if let Some(receipt) = given {
            return Some(receipt.to_string());
        }

        let note = self.note_number.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
        Some(format!("{}-L{}", note, line))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub clients_created: usize,
    pub purchases_created: usize,
    pub payments_added: usize,
    pub duplicates: usize,
}

pub fn load_rows<R: Read>(reader: R) -> Result<Vec<ImportRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<ImportRow>, csv::Error>>()?;

    Ok(rows)
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<ImportRow>> {
    let file = std::fs::File::open(csv_path)?;
    load_rows(file)
}

/// Write rows through the ledger; stops at the first row that breaks a rule
pub fn import_rows(ledger: &mut Ledger, rows: &[ImportRow]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (index, row) in rows.iter().enumerate() {
        // Header is line 1
        let line = index + 2;
        import_row(ledger, row, line, &mut summary).map_err(|e| at_line(line, e))?;
        summary.rows += 1;
    }

    info!(
        rows = summary.rows,
        clients = summary.clients_created,
        purchases = summary.purchases_created,
        payments = summary.payments_added,
        duplicates = summary.duplicates,
        "import finished"
    );
    Ok(summary)
}

fn import_row(
    ledger: &mut Ledger,
    row: &ImportRow,
    line: usize,
    summary: &mut ImportSummary,
) -> Result<()> {
    let client = match ledger.client_by_nickname(row.client_nickname.trim())? {
        Some(client) => client,
        None => {
            summary.clients_created += 1;
            ledger.create_client(row.new_client())?
        }
    };

    let (description, total_value) = match (&row.description, row.total_value) {
        (Some(description), Some(total_value)) => (description, total_value),
        (None, None) => return Ok(()),
        _ => {
            return Err(LedgerError::validation(
                "description and total_value must be given together",
            ))
        }
    };

    let existing = match row.note_number.as_deref() {
        Some(note) => match ledger.purchase_by_note(note) {
            Ok(purchase) => Some(purchase),
            Err(LedgerError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    let Some(purchase) = existing else {
        let mut new = NewPurchase::new(description.as_str(), total_value);
        new.note_number = row.note_number.clone();
        new.payment = row.new_payment(line);

        ledger.create_purchase(client.id, new)?;
        summary.purchases_created += 1;
        return Ok(());
    };

    let Some(mut payment) = row.new_payment(line) else {
        debug!(note = %purchase.note_number, "purchase already imported");
        summary.duplicates += 1;
        return Ok(());
    };
    payment.description = Some(description.clone());

    match ledger.create_payment(purchase.id, payment) {
        Ok(_) => summary.payments_added += 1,
        Err(LedgerError::BusinessRule(reason)) => {
            debug!(note = %purchase.note_number, %reason, "payment skipped");
            summary.duplicates += 1;
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

fn at_line(line: usize, err: LedgerError) -> LedgerError {
    match err {
        LedgerError::NotFound(m) => LedgerError::NotFound(format!("line {}: {}", line, m)),
        LedgerError::Validation(m) => LedgerError::Validation(format!("line {}: {}", line, m)),
        LedgerError::BusinessRule(m) => LedgerError::BusinessRule(format!("line {}: {}", line, m)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PurchaseFilter, PurchaseStatus};
    use crate::store::Page;

    const SEED: &str = "\
client_name,client_nickname,client_phone,client_email,description,total_value,amount,method,note_number,receipt_number
João Silva,joao,11999999999,joao@email.com,Compra de sementes,100,50,Pix,NF-0001,REC-0001
João Silva,joao,11999999999,joao@email.com,Compra de ferramentas,300,300,Cartão,NF-0002,REC-0002
Maria Souza,maria,11988888888,maria@email.com,Compra de adubo,200,0,Dinheiro,NF-0003,REC-0003
Carlos Lima,carlos,21977777777,carlos@email.com,,,,,,
João Silva,joao,11999999999,joao@email.com,Segunda parcela,100,50,Pix,NF-0001,REC-0004
";

    #[test]
    fn test_load_rows_reads_optional_columns() {
        let rows = load_rows(SEED.as_bytes()).unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].client_nickname, "joao");
        assert_eq!(rows[0].amount, Some(50.0));
        assert_eq!(rows[3].description, None);
        assert_eq!(rows[3].total_value, None);
    }

    #[test]
    fn test_import_seed() {
        let mut ledger = Ledger::in_memory().unwrap();
        let rows = load_rows(SEED.as_bytes()).unwrap();

        let summary = import_rows(&mut ledger, &rows).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                rows: 5,
                clients_created: 3,
                purchases_created: 3,
                payments_added: 1,
                duplicates: 0,
            }
        );

        let seeds = ledger.purchase_by_note("NF-0001").unwrap();
        assert_eq!(seeds.total_paid_value, 100.0);
        assert_eq!(seeds.status, PurchaseStatus::Paid);

        let fertilizer = ledger.purchase_by_note("NF-0003").unwrap();
        assert_eq!(fertilizer.status, PurchaseStatus::Pending);
        assert!(ledger.purchase_payments(fertilizer.id, Page::all()).unwrap().is_empty());
    }

    #[test]
    fn test_reimport_only_counts_duplicates() {
        let mut ledger = Ledger::in_memory().unwrap();
        let rows = load_rows(SEED.as_bytes()).unwrap();
        import_rows(&mut ledger, &rows).unwrap();

        let again = import_rows(&mut ledger, &rows).unwrap();
        assert_eq!(again.clients_created, 0);
        assert_eq!(again.purchases_created, 0);
        assert_eq!(again.payments_added, 0);
        assert_eq!(again.duplicates, 4);

        assert_eq!(ledger.list_purchases(Page::all(), PurchaseFilter::All).unwrap().len(), 3);
    }

    #[test]
    fn test_reimport_without_receipts_does_not_pay_twice() {
        let csv = "\
client_name,client_nickname,description,total_value,amount,method,note_number
Ana Lima,ana,Ração,100,10,Pix,NF-0100
Ana Lima,ana,Ração,100,10,Pix,NF-0100
";
        let mut ledger = Ledger::in_memory().unwrap();
        let rows = load_rows(csv.as_bytes()).unwrap();

        let first = import_rows(&mut ledger, &rows).unwrap();
        assert_eq!(first.purchases_created, 1);
        assert_eq!(first.payments_added, 1);

        let again = import_rows(&mut ledger, &rows).unwrap();
        assert_eq!(again.payments_added, 0);
        assert_eq!(again.duplicates, 2);

        let purchase = ledger.purchase_by_note("NF-0100").unwrap();
        assert_eq!(purchase.total_paid_value, 20.0);
        let receipts: Vec<String> = ledger
            .purchase_payments(purchase.id, Page::all())
            .unwrap()
            .into_iter()
            .map(|p| p.receipt_number)
            .collect();
        assert_eq!(receipts, vec!["NF-0100-L3", "NF-0100-L2"]);
    }

    #[test]
    fn test_bad_row_reports_line() {
        let mut ledger = Ledger::in_memory().unwrap();
        let rows = load_rows(
            "client_name,client_nickname,description,total_value\nAna,ana,Seeds,-5\n".as_bytes(),
        )
        .unwrap();

        let err = import_rows(&mut ledger, &rows).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ref m) if m.starts_with("line 2:")));
    }

    #[test]
    fn test_load_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
