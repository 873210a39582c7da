//! Process-local repository backed by hash maps.
//!
//! Registered as the `"memory"` backend; also what the service tests run
//! against. Nothing survives the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{RepositoryError, TaxRecordRepository};
use crate::models::{NewUser, TaxRecord, User};

#[derive(Default)]
struct State {
    users: HashMap<i64, User>,
    next_user_id: i64,
    // keyed by month so upserts replace in place
    records: HashMap<i64, BTreeMap<u32, TaxRecord>>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaxRecordRepository for InMemoryRepository {
    async fn get_user(
        &self,
        id: i64,
    ) -> Result<User, RepositoryError> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_user(
        &self,
        user: NewUser,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate(format!(
                "user with email '{}' already exists",
                user.email
            )));
        }

        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            email: user.email,
            phone: user.phone,
            address: user.address,
            job: user.job,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_tax_records(
        &self,
        user_id: i64,
    ) -> Result<Option<Vec<TaxRecord>>, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .records
            .get(&user_id)
            .map(|by_month| by_month.values().cloned().collect()))
    }

    async fn save_tax_records(
        &self,
        user_id: i64,
        records: &[TaxRecord],
    ) -> Result<(), RepositoryError> {
        if let Some(record) = records.iter().find(|r| r.user_id != user_id) {
            return Err(RepositoryError::Database(format!(
                "record for user {} passed to save for user {}",
                record.user_id, user_id
            )));
        }

        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(RepositoryError::Database(format!(
                "cannot save tax records for unknown user {}",
                user_id
            )));
        }
        let by_month = state.records.entry(user_id).or_default();
        for record in records {
            by_month.insert(record.month, record.clone());
        }

        Ok(())
    }
}

/// [`RepositoryFactory`] for the `"memory"` backend. Every `create` returns
/// a fresh, empty store.
pub struct InMemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for InMemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Arc<dyn TaxRecordRepository>, RepositoryError> {
        Ok(Arc::new(InMemoryRepository::new()))
    }
}
