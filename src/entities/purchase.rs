// 🧾 Purchase Entity - one sale on credit
//
// `total_paid_value` and `status` are derived from the purchase's active
// payments and are only ever written by `totals::compute` results.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::payment::NewPayment;
use crate::error::{messages, LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Nothing paid yet
    Pending,
    /// Something paid, balance left
    Partial,
    Paid,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Partial => "partial",
            PurchaseStatus::Paid => "paid",
        }
    }

    pub fn is_outstanding(&self) -> bool {
        !matches!(self, PurchaseStatus::Paid)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid purchase status {0:?}, expected pending, partial or paid")]
pub struct UnknownStatus(String);

impl FromStr for PurchaseStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseStatus::Pending),
            "partial" => Ok(PurchaseStatus::Partial),
            "paid" => Ok(PurchaseStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql for PurchaseStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PurchaseStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub client_id: i64,
    pub description: String,
    pub total_value: f64,
    pub total_paid_value: f64,
    pub status: PurchaseStatus,
    /// NF-0001 style; assigned on insert when the caller has none
    pub note_number: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// Amount still owed
    pub fn balance(&self) -> f64 {
        (self.total_value - self.total_paid_value).max(0.0)
    }
}

/// Which purchases a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseFilter {
    /// Active and inactive
    All,
    #[default]
    Active,
    /// Active and not fully paid
    Outstanding,
}

// ============================================================================
// INPUT
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPurchase {
    pub description: String,
    pub total_value: f64,
    #[serde(default)]
    pub note_number: Option<String>,
    /// Payment registered together with the purchase
    #[serde(default)]
    pub payment: Option<NewPayment>,
}

impl NewPurchase {
    pub fn new(description: impl Into<String>, total_value: f64) -> Self {
        NewPurchase {
            description: description.into(),
            total_value,
            ..Default::default()
        }
    }

    pub fn with_note_number(mut self, note_number: impl Into<String>) -> Self {
        self.note_number = Some(note_number.into());
        self
    }

    pub fn with_payment(mut self, payment: NewPayment) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(LedgerError::validation(messages::PURCHASE_INVALID_DESCRIPTION));
        }
        validate_total(self.total_value)?;
        if let Some(payment) = &self.payment {
            payment.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurchaseUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub client_id: Option<i64>,
}

impl PurchaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.total_value.is_none() && self.client_id.is_none()
    }

    /// Whether the change can move paid totals or status
    pub fn affects_totals(&self) -> bool {
        self.total_value.is_some() || self.client_id.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LedgerError::validation(messages::DATA_FIELDS_EMPTY));
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(LedgerError::validation(messages::PURCHASE_INVALID_DESCRIPTION));
            }
        }
        if let Some(total) = self.total_value {
            validate_total(total)?;
        }
        Ok(())
    }
}

fn validate_total(total: f64) -> Result<()> {
    if !total.is_finite() || total <= 0.0 {
        return Err(LedgerError::validation(messages::PURCHASE_INVALID_TOTAL));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trip() {
        for status in [PurchaseStatus::Pending, PurchaseStatus::Partial, PurchaseStatus::Paid] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>().unwrap(), status);
        }
        assert!("settled".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_new_purchase_validation() {
        assert!(NewPurchase::new("Seeds", 100.0).validate().is_ok());
        assert!(NewPurchase::new("Seeds", 0.0).validate().is_err());
        assert!(NewPurchase::new("Seeds", f64::NAN).validate().is_err());
        assert!(NewPurchase::new(" ", 10.0).validate().is_err());
        assert!(NewPurchase::new("Seeds", 10.0)
            .with_payment(NewPayment::new(-5.0, "pix"))
            .validate()
            .is_err());
    }

    #[test]
    fn test_new_purchase_rejects_status_and_client() {
        let json = r#"{"description": "Seeds", "total_value": 10, "status": "paid"}"#;
        assert!(serde_json::from_str::<NewPurchase>(json).is_err());

        let json = r#"{"description": "Seeds", "total_value": 10, "client_id": 3}"#;
        assert!(serde_json::from_str::<NewPurchase>(json).is_err());
    }

    #[test]
    fn test_update_requires_a_field() {
        assert!(PurchaseUpdate::default().validate().is_err());

        let update = PurchaseUpdate {
            description: Some("Tools".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.affects_totals());
    }

    #[test]
    fn test_balance_never_negative() {
        let now = Utc::now();
        let purchase = Purchase {
            id: 1,
            client_id: 1,
            description: "Fertilizer".into(),
            total_value: 100.0,
            total_paid_value: 120.0,
            status: PurchaseStatus::Paid,
            note_number: "NF-0001".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(purchase.balance(), 0.0);
    }
}
