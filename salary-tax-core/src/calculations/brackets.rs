//! The progressive schedule and the lookup from a cumulative taxable amount
//! to its bracket.
//!
//! | Cumulative taxable     | Rate | Deduction |
//! |------------------------|------|-----------|
//! | ≤ 36,000               | 3%   | 0         |
//! | ≤ 144,000              | 10%  | 2,520     |
//! | ≤ 300,000              | 20%  | 16,920    |
//! | ≤ 420,000              | 25%  | 31,920    |
//! | ≤ 660,000              | 30%  | 52,920    |
//! | ≤ 960,000              | 35%  | 85,920    |
//! | above 960,000          | 45%  | 181,920   |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::TaxBracket;

/// Bands ordered by ascending upper bound. The last one is unbounded.
pub const TAX_BRACKETS: [TaxBracket; 7] = [
    TaxBracket {
        upper_bound: Some(dec!(36000)),
        rate: dec!(0.03),
        deduction: dec!(0),
    },
    TaxBracket {
        upper_bound: Some(dec!(144000)),
        rate: dec!(0.10),
        deduction: dec!(2520),
    },
    TaxBracket {
        upper_bound: Some(dec!(300000)),
        rate: dec!(0.20),
        deduction: dec!(16920),
    },
    TaxBracket {
        upper_bound: Some(dec!(420000)),
        rate: dec!(0.25),
        deduction: dec!(31920),
    },
    TaxBracket {
        upper_bound: Some(dec!(660000)),
        rate: dec!(0.30),
        deduction: dec!(52920),
    },
    TaxBracket {
        upper_bound: Some(dec!(960000)),
        rate: dec!(0.35),
        deduction: dec!(85920),
    },
    TaxBracket {
        upper_bound: None,
        rate: dec!(0.45),
        deduction: dec!(181920),
    },
];

/// Returns the bracket for a cumulative taxable amount.
///
/// Upper bounds are inclusive, so exactly 36,000 stays in the first band.
/// Amounts at or below zero resolve to the first band; amounts above the
/// highest finite bound resolve to the top band.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use salary_tax_core::calculations::resolve;
///
/// assert_eq!(resolve(dec!(36000)).rate, dec!(0.03));
/// assert_eq!(resolve(dec!(36000.01)).deduction, dec!(2520));
/// ```
pub fn resolve(taxable: Decimal) -> &'static TaxBracket {
    TAX_BRACKETS
        .iter()
        .find(|bracket| bracket.covers(taxable))
        .unwrap_or(&TAX_BRACKETS[TAX_BRACKETS.len() - 1])
}
