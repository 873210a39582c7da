use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One band of the progressive schedule.
///
/// `upper_bound` is inclusive; `None` marks the unbounded top band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub deduction: Decimal,
}

impl TaxBracket {
    /// Whether `taxable` falls at or below this band's upper bound.
    pub fn covers(
        &self,
        taxable: Decimal,
    ) -> bool {
        self.upper_bound.is_none_or(|bound| taxable <= bound)
    }

    /// Tax due on a cumulative taxable amount: `taxable * rate - deduction`.
    pub fn cumulative_tax(
        &self,
        taxable: Decimal,
    ) -> Decimal {
        taxable * self.rate - self.deduction
    }
}
