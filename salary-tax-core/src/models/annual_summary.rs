use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxRecord;

/// Year-to-date totals for one user, with the per-month breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub user_id: i64,
    pub email: String,
    pub total_salary: Decimal,
    pub total_tax: Decimal,
    pub per_month: Vec<TaxRecord>,
}

impl AnnualSummary {
    /// Builds a summary from a user's records. Records are ordered by month.
    pub fn from_records(
        user_id: i64,
        email: String,
        mut records: Vec<TaxRecord>,
    ) -> Self {
        records.sort_by_key(|record| record.month);

        let total_salary = records.iter().map(|record| record.salary).sum();
        let total_tax = records.iter().map(|record| record.tax).sum();

        Self {
            user_id,
            email,
            total_salary,
            total_tax,
            per_month: records,
        }
    }
}
