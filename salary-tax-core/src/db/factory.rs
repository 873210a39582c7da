//! Runtime selection of the record store.
//!
//! The CLI reads a [`DbConfig`] from its config file, and the binary
//! registers the backends it was built with (`memory` from this crate,
//! `sqlite` from `salary-tax-db-sqlite`). [`RepositoryRegistry::create`]
//! then opens whichever store the config names.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::repository::{RepositoryError, TaxRecordRepository};

/// Which store to open and how to reach it.
///
/// | backend  | connection_string                                  |
/// |----------|----------------------------------------------------|
/// | `sqlite` | `sqlite:salary_tax.db?mode=rwc`, `sqlite::memory:` |
/// | `memory` | ignored                                            |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "sqlite:salary_tax.db?mode=rwc".to_string(),
        }
    }
}

/// Opens one kind of record store.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Returns a store whose schema is ready for tax records.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Arc<dyn TaxRecordRepository>, RepositoryError>;
}

/// The record-store backends known to a binary.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A later factory with the same name wins.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Opens the store named by `config.backend`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] when the backend is not
    /// registered; otherwise whatever the backend's factory reports.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Arc<dyn TaxRecordRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "backend '{}' is not available (known: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        debug!(backend = %config.backend, "opening record store");
        factory.create(config).await
    }
}
