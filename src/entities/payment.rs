// 💵 Payment Entity - money received against a purchase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::blank_to_none;
use crate::error::{messages, LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub purchase_id: i64,
    pub amount: f64,
    /// When the money changed hands (may differ from `created_at`)
    pub payment_date: Option<DateTime<Utc>>,
    /// pix, cash, card, ...
    pub method: String,
    pub description: Option<String>,
    /// REC-0001 style; assigned on insert when the caller has none
    pub receipt_number: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// INPUT
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPayment {
    pub amount: f64,
    pub method: String,
    /// Unix seconds
    #[serde(default)]
    pub payment_date: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

impl NewPayment {
    pub fn new(amount: f64, method: impl Into<String>) -> Self {
        NewPayment {
            amount,
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_receipt_number(mut self, receipt_number: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt_number.into());
        self
    }

    pub fn with_payment_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date.timestamp());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        if self.method.trim().is_empty() {
            return Err(LedgerError::validation(messages::PAYMENT_INVALID_METHOD));
        }
        Ok(())
    }

    pub(crate) fn normalized_description(&self) -> Option<String> {
        blank_to_none(self.description.clone())
    }

    pub(crate) fn normalized_receipt(&self) -> Option<String> {
        blank_to_none(self.receipt_number.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentUpdate {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_date: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PaymentUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.payment_date.is_none()
            && self.method.is_none()
            && self.description.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LedgerError::validation(messages::DATA_FIELDS_EMPTY));
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(method) = &self.method {
            if method.trim().is_empty() {
                return Err(LedgerError::validation(messages::PAYMENT_INVALID_METHOD));
            }
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::validation(messages::PAYMENT_INVALID_AMOUNT));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        assert!(NewPayment::new(50.0, "pix").validate().is_ok());

        let err = NewPayment::new(0.0, "pix").validate().unwrap_err();
        assert_eq!(err.to_string(), messages::PAYMENT_INVALID_AMOUNT);
        assert!(NewPayment::new(10.0, " ").validate().is_err());
    }

    #[test]
    fn test_update_validation() {
        assert!(PaymentUpdate::default().validate().is_err());

        let update = PaymentUpdate {
            amount: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = PaymentUpdate {
            description: Some("second installment".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_blank_receipt_is_treated_as_absent() {
        let payment = NewPayment::new(10.0, "cash").with_receipt_number("  ");
        assert_eq!(payment.normalized_receipt(), None);
    }
}
