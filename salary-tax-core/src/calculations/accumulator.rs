//! Cumulative (year-to-date) withholding.
//!
//! Tax is never computed on a single month in isolation. For every month,
//! in ascending order, the accumulator:
//!
//! 1. adds the month's taxable contribution (salary above the 5,000 monthly
//!    threshold) to the running taxable total,
//! 2. resolves the bracket for that running total and computes the tax due
//!    on the year so far (`taxable * rate - deduction`),
//! 3. attributes to the month only the part of that figure not already
//!    attributed to earlier months.
//!
//! Summing the monthly amounts therefore always gives the tax a single
//! year-end computation would produce at that cut-off.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use salary_tax_core::MonthSalary;
//! use salary_tax_core::calculations::AnnualTaxAccumulator;
//!
//! let entries = vec![
//!     MonthSalary::new(1, dec!(41000)),
//!     MonthSalary::new(2, dec!(113000)),
//! ];
//!
//! let months = AnnualTaxAccumulator::new().accumulate(&entries).unwrap();
//!
//! assert_eq!(months[0].tax, dec!(1080.00));
//! assert_eq!(months[1].tax, dec!(10800.00));
//! ```

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::trace;

use crate::calculations::brackets::resolve;
use crate::calculations::common::round_half_up;
use crate::{MonthSalary, TaxRecord};

/// Salary below this amount is not taxed, per month.
pub const MONTHLY_THRESHOLD: Decimal = dec!(5000);

/// Errors raised while validating a batch of month salaries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccumulatorError {
    /// The same month appears more than once in one submission.
    #[error("duplicate months in submission: {0:?}")]
    DuplicateMonths(Vec<u32>),

    /// Month outside 1–12.
    #[error("month {0} is out of range (expected 1-12)")]
    InvalidMonth(u32),

    #[error("salary for month {month} must not be negative (got {salary})")]
    NegativeSalary { month: u32, salary: Decimal },

    #[error("submission contains no months")]
    EmptySubmission,
}

/// Taxable base and tax already withheld before the first month handed to
/// the accumulator. Zero when recomputing a year from its first month,
/// which is what the service always does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct OpeningBalance {
    pub(crate) taxable_base: Decimal,
    pub(crate) tax_paid: Decimal,
}

/// Salary above the monthly threshold: `salary - min(salary, 5000)`.
pub fn taxable_contribution(salary: Decimal) -> Decimal {
    salary - salary.min(MONTHLY_THRESHOLD)
}

/// Checks a submission before anything is loaded or saved.
///
/// # Errors
///
/// * [`AccumulatorError::EmptySubmission`] when there is nothing to record.
/// * [`AccumulatorError::DuplicateMonths`] lists every month that occurs
///   more than once, ascending.
/// * [`AccumulatorError::InvalidMonth`] for a month outside 1–12.
/// * [`AccumulatorError::NegativeSalary`] for a salary below zero.
pub fn validate_entries(entries: &[MonthSalary]) -> Result<(), AccumulatorError> {
    if entries.is_empty() {
        return Err(AccumulatorError::EmptySubmission);
    }

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();

    for entry in entries {
        if !(1..=12).contains(&entry.month) {
            return Err(AccumulatorError::InvalidMonth(entry.month));
        }
        if entry.salary < Decimal::ZERO {
            return Err(AccumulatorError::NegativeSalary {
                month: entry.month,
                salary: entry.salary,
            });
        }
        if !seen.insert(entry.month) {
            duplicates.insert(entry.month);
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(AccumulatorError::DuplicateMonths(
            duplicates.into_iter().collect(),
        ))
    }
}

/// Folds a new submission into a user's stored months.
///
/// A stored month that is resubmitted is replaced by the new entry. Stored
/// months that are not touched come back as zero-tax placeholders so their
/// tax is recomputed along with everything else. The result is sorted by
/// month.
pub fn merge(
    existing: &[TaxRecord],
    new_entries: &[MonthSalary],
) -> Vec<MonthSalary> {
    let resubmitted: BTreeSet<u32> = new_entries.iter().map(|entry| entry.month).collect();

    let mut merged: Vec<MonthSalary> = existing
        .iter()
        .filter(|record| !resubmitted.contains(&record.month))
        .map(|record| MonthSalary::new(record.month, record.salary))
        .chain(
            new_entries
                .iter()
                .map(|entry| MonthSalary::new(entry.month, entry.salary)),
        )
        .collect();

    merged.sort_by_key(|entry| entry.month);
    merged
}

/// Attributes cumulative tax to each month of a user's year.
#[derive(Debug, Clone, Default)]
pub struct AnnualTaxAccumulator {
    opening: OpeningBalance,
}

impl AnnualTaxAccumulator {
    /// An accumulator starting from an empty year.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_opening(opening: OpeningBalance) -> Self {
        Self { opening }
    }

    /// Computes the tax of every entry and returns the entries sorted by
    /// month with `tax` filled in (rounded to two decimals).
    ///
    /// Any `tax` already set on the input is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AccumulatorError`] if the entries fail [`validate_entries`].
    pub fn accumulate(
        &self,
        entries: &[MonthSalary],
    ) -> Result<Vec<MonthSalary>, AccumulatorError> {
        validate_entries(entries)?;

        let mut months: Vec<MonthSalary> = entries.to_vec();
        months.sort_by_key(|entry| entry.month);

        let mut cumulative_taxable = self.opening.taxable_base;
        let mut attributed = Decimal::ZERO;

        for entry in &mut months {
            cumulative_taxable += taxable_contribution(entry.salary);

            let bracket = resolve(cumulative_taxable);
            let cumulative_tax = bracket.cumulative_tax(cumulative_taxable);

            entry.tax = round_half_up(cumulative_tax - attributed - self.opening.tax_paid);
            attributed += entry.tax;

            trace!(
                month = entry.month,
                %cumulative_taxable,
                rate = %bracket.rate,
                tax = %entry.tax,
                "attributed monthly tax"
            );
        }

        Ok(months)
    }
}
