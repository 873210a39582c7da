//! Tax calculations for cumulative monthly withholding.
//!
//! The bracket resolver maps a year-to-date taxable amount onto the
//! progressive schedule; the accumulator walks a user's months in order and
//! attributes to each month the tax that became due in it.

pub mod accumulator;
pub mod brackets;
pub mod common;

pub use accumulator::{
    AccumulatorError, AnnualTaxAccumulator, MONTHLY_THRESHOLD, merge,
    taxable_contribution, validate_entries,
};
pub use brackets::{TAX_BRACKETS, resolve};
