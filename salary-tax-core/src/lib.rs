pub mod calculations;
pub mod db;
pub mod models;
pub mod service;

pub use db::repository::{RepositoryError, TaxRecordRepository};
pub use models::*;
pub use service::{ErrorKind, TaxService, TaxServiceError};
