use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewUser, TaxRecord, User};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for users and their monthly tax records.
///
/// A user is in one of two states: no record set yet (`get_tax_records`
/// returns `None`) or a record set with at most one record per month.
#[async_trait]
pub trait TaxRecordRepository: Send + Sync {
    // Users
    async fn get_user(&self, id: i64) -> Result<User, RepositoryError>;
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    // Tax records
    /// All records of a user, ascending by month, or `None` if the user has
    /// never had a submission saved.
    async fn get_tax_records(
        &self,
        user_id: i64,
    ) -> Result<Option<Vec<TaxRecord>>, RepositoryError>;

    /// Upserts `records` by month. Months not present in `records` are kept.
    /// Creates the user's record set on first use. Either every record is
    /// written or none is.
    async fn save_tax_records(
        &self,
        user_id: i64,
        records: &[TaxRecord],
    ) -> Result<(), RepositoryError>;
}
