use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One month of reported salary, as submitted by a caller.
///
/// `tax` is an output: it is ignored on input and filled in by the
/// accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSalary {
    pub month: u32,
    pub salary: Decimal,
    #[serde(default, skip_deserializing)]
    pub tax: Decimal,
}

impl MonthSalary {
    pub fn new(
        month: u32,
        salary: Decimal,
    ) -> Self {
        Self {
            month,
            salary,
            tax: Decimal::ZERO,
        }
    }
}
