use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MonthSalary;

/// Persisted tax outcome for one user and one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub user_id: i64,
    pub month: u32,
    pub salary: Decimal,
    pub tax: Decimal,
}

impl TaxRecord {
    pub fn from_month_salary(
        user_id: i64,
        entry: &MonthSalary,
    ) -> Self {
        Self {
            user_id,
            month: entry.month,
            salary: entry.salary,
            tax: entry.tax,
        }
    }
}
