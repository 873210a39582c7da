use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salary_tax_core::{NewUser, RepositoryError, TaxRecord, TaxRecordRepository, User};
use sqlx::{Row, sqlite::SqlitePool};
use tracing::debug;

use crate::decimal::get_decimal;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: row.try_get("id").map_err(db_error)?,
        email: row.try_get("email").map_err(db_error)?,
        phone: row.try_get("phone").map_err(db_error)?,
        address: row.try_get("address").map_err(db_error)?,
        job: row.try_get("job").map_err(db_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_tax_record(row: &sqlx::sqlite::SqliteRow) -> Result<TaxRecord, RepositoryError> {
    Ok(TaxRecord {
        user_id: row.try_get("user_id").map_err(db_error)?,
        month: row.try_get("month").map_err(db_error)?,
        salary: get_decimal(row, "salary")?,
        tax: get_decimal(row, "tax")?,
    })
}

#[async_trait]
impl TaxRecordRepository for SqliteRepository {
    async fn get_user(
        &self,
        id: i64,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, email, phone, address, job, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_user(&row)
    }

    async fn create_user(
        &self,
        user: NewUser,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (email, phone, address, job, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.job)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref inner) if inner.is_unique_violation() => {
                RepositoryError::Duplicate(format!(
                    "user with email '{}' already exists",
                    user.email
                ))
            }
            other => db_error(other),
        })?;

        self.get_user(result.last_insert_rowid()).await
    }

    async fn get_tax_records(
        &self,
        user_id: i64,
    ) -> Result<Option<Vec<TaxRecord>>, RepositoryError> {
        let has_record_set = sqlx::query("SELECT user_id FROM user_tax WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .is_some();

        if !has_record_set {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT user_id, month, salary, tax
             FROM tax_records
             WHERE user_id = ?
             ORDER BY month",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter()
            .map(row_to_tax_record)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
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

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO user_tax (user_id, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for record in records {
            sqlx::query(
                "INSERT INTO tax_records (user_id, month, salary, tax) VALUES (?, ?, ?, ?)
                 ON CONFLICT (user_id, month) DO UPDATE SET
                    salary = excluded.salary,
                    tax = excluded.tax",
            )
            .bind(user_id)
            .bind(record.month)
            .bind(record.salary.to_string())
            .bind(record.tax.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(user_id, months = records.len(), "upserted tax records");

        Ok(())
    }
}
