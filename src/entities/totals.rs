// Purchase totals - derived from active payments only

use super::payment::Payment;
use super::purchase::PurchaseStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total_paid_value: f64,
    pub status: PurchaseStatus,
}

impl Totals {
    /// Totals of a purchase with no (active) payments
    pub fn unpaid() -> Self {
        Totals {
            total_paid_value: 0.0,
            status: PurchaseStatus::Pending,
        }
    }
}

/// Recompute paid value and status of a purchase worth `total_value`
pub fn compute<'a, I>(total_value: f64, payments: I) -> Totals
where
    I: IntoIterator<Item = &'a Payment>,
{
    let paid: f64 = payments
        .into_iter()
        .filter(|p| p.is_active)
        .map(|p| p.amount)
        .sum();

    let status = if paid >= total_value {
        PurchaseStatus::Paid
    } else if paid > 0.0 {
        PurchaseStatus::Partial
    } else {
        PurchaseStatus::Pending
    };

    Totals {
        total_paid_value: paid,
        status,
    }
}
