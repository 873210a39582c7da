use std::io::Read;

use rust_decimal::Decimal;
use salary_tax_core::{MonthSalary, TaxRecord, TaxService, TaxServiceError};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading salary submissions.
#[derive(Debug, Error)]
pub enum SalaryLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Tax service error: {0}")]
    Service(#[from] TaxServiceError),
}

impl From<csv::Error> for SalaryLoaderError {
    fn from(err: csv::Error) -> Self {
        SalaryLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a salary CSV file.
///
/// - `month`: 1–12
/// - `salary`: gross salary paid in that month
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SalaryRecord {
    pub month: u32,
    pub salary: Decimal,
}

impl From<SalaryRecord> for MonthSalary {
    fn from(record: SalaryRecord) -> Self {
        MonthSalary::new(record.month, record.salary)
    }
}

/// Loader for month/salary submissions from CSV files.
///
/// Parsing only checks the shape of each row. Empty files, month range,
/// duplicates and negative salaries are checked by the tax service.
pub struct SalaryLoader;

impl SalaryLoader {
    /// Parse month salaries from a CSV reader with a `month,salary` header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<MonthSalary>, SalaryLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();

        for result in csv_reader.deserialize() {
            let record: SalaryRecord = result?;
            entries.push(record.into());
        }

        Ok(entries)
    }

    /// Submit parsed entries for a user and return the stored year.
    pub async fn load(
        service: &TaxService,
        user_id: i64,
        entries: &[MonthSalary],
    ) -> Result<Vec<TaxRecord>, SalaryLoaderError> {
        Ok(service.compute_and_save(user_id, entries).await?)
    }
}
