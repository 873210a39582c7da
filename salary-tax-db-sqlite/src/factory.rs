use std::sync::Arc;

use async_trait::async_trait;
use salary_tax_core::db::{DbConfig, RepositoryFactory};
use salary_tax_core::{RepositoryError, TaxRecordRepository};
use tracing::info;

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`salary_tax_core::db::RepositoryRegistry`] to make
/// the `"sqlite"` backend available:
///
/// ```rust,no_run
/// use salary_tax_core::db::RepositoryRegistry;
/// use salary_tax_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// The connection string is a sqlx URL: `sqlite:salary_tax.db?mode=rwc`
    /// creates the file if missing, `sqlite::memory:` is an ephemeral
    /// database.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Arc<dyn TaxRecordRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        info!(database = %config.connection_string, "sqlite repository ready");
        Ok(Arc::new(repo))
    }
}
