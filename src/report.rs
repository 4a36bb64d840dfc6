use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::profile::StudentFinancialProfile;
use crate::records::Payment;

/// dashboard totals for the selected academic year
///
/// `total_received` is scoped to the year; `total_outstanding` is lifetime;
/// `total_due` is their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTotals {
    pub total_due: Money,
    pub total_received: Money,
    pub total_outstanding: Money,
}

/// roll profiles and payments up into totals; all zero without a year
pub fn build_totals(
    profiles: &[StudentFinancialProfile],
    payments: &[Payment],
    academic_year_id: Option<&str>,
) -> AggregateTotals {
    let Some(year) = academic_year_id else {
        return AggregateTotals::default();
    };

    let total_received: Money = payments
        .iter()
        .filter(|p| p.in_year(year))
        .map(|p| p.amount_paid)
        .sum();
    let total_outstanding: Money = profiles.iter().map(|p| p.total_balance).sum();

    AggregateTotals {
        total_due: total_received + total_outstanding,
        total_received,
        total_outstanding,
    }
}
