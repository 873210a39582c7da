//! CSV ingestion, configuration and logging setup for the `salary-tax`
//! command-line tool.

pub mod config;
pub mod loader;
pub mod logging;

use salary_tax_core::db::{InMemoryRepositoryFactory, RepositoryRegistry};
use salary_tax_db_sqlite::SqliteRepositoryFactory;

pub use config::{AppConfig, ConfigError};
pub use loader::{SalaryLoader, SalaryLoaderError, SalaryRecord};

/// Registry with every storage backend this tool ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(InMemoryRepositoryFactory));
    registry
}
