//! Reconciles salary submissions against a user's stored tax records and
//! answers month and year queries.
//!
//! Every operation takes the user id explicitly; resolving who the caller is
//! happens before this layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculations::{AccumulatorError, AnnualTaxAccumulator, merge, validate_entries};
use crate::db::{RepositoryError, TaxRecordRepository};
use crate::models::{AnnualSummary, MonthSalary, TaxRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] AccumulatorError),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("user {0} has no tax records")]
    NoTaxRecords(i64),

    #[error("no tax record for user {user_id} in month {month}")]
    MonthNotFound { user_id: i64, month: u32 },

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Coarse classification for callers that map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Storage,
}

impl TaxServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UserNotFound(_) | Self::NoTaxRecords(_) | Self::MonthNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::Storage,
        }
    }
}

pub struct TaxService {
    repo: Arc<dyn TaxRecordRepository>,
    accumulator: AnnualTaxAccumulator,
    // one write guard per user; load → merge → save runs under it
    user_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl TaxService {
    pub fn new(repo: Arc<dyn TaxRecordRepository>) -> Self {
        Self {
            repo,
            accumulator: AnnualTaxAccumulator::new(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn TaxRecordRepository> {
        &self.repo
    }

    /// Computes tax for a submission and persists the user's whole year.
    ///
    /// Resubmitted months replace their stored values; stored months not in
    /// `entries` are kept and their tax recomputed, since a newly reported
    /// earlier month shifts the cumulative base of every later one.
    ///
    /// Returns the stored records for the year, ascending by month.
    ///
    /// # Errors
    ///
    /// * [`TaxServiceError::InvalidInput`]: an empty batch, duplicate
    ///   months, a month outside 1–12 or a negative salary. Nothing is read
    ///   or written.
    /// * [`TaxServiceError::UserNotFound`]: `user_id` is not a registered
    ///   user.
    /// * [`TaxServiceError::Repository`]: the store failed; the save is
    ///   atomic so no partial year is left behind.
    pub async fn compute_and_save(
        &self,
        user_id: i64,
        entries: &[MonthSalary],
    ) -> Result<Vec<TaxRecord>, TaxServiceError> {
        if let Err(err) = validate_entries(entries) {
            warn!(user_id, error = %err, "rejected salary submission");
            return Err(err.into());
        }

        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.recompute_year(user_id, entries).await
        };
        drop(lock);
        self.release_user_lock(user_id);

        result
    }

    async fn recompute_year(
        &self,
        user_id: i64,
        entries: &[MonthSalary],
    ) -> Result<Vec<TaxRecord>, TaxServiceError> {
        self.repo.get_user(user_id).await.map_err(|e| match e {
            RepositoryError::NotFound => TaxServiceError::UserNotFound(user_id),
            other => TaxServiceError::Repository(other),
        })?;

        let existing = self.repo.get_tax_records(user_id).await?;
        debug!(
            user_id,
            stored_months = existing.as_ref().map_or(0, Vec::len),
            submitted_months = entries.len(),
            "merging submission"
        );

        let merged = merge(existing.as_deref().unwrap_or_default(), entries);
        let computed = self.accumulator.accumulate(&merged)?;

        let records: Vec<TaxRecord> = computed
            .iter()
            .map(|entry| TaxRecord::from_month_salary(user_id, entry))
            .collect();
        self.repo.save_tax_records(user_id, &records).await?;

        info!(
            user_id,
            months = records.len(),
            created = existing.is_none(),
            "saved tax records"
        );

        Ok(records)
    }

    /// Tax attributed to one month.
    ///
    /// # Errors
    ///
    /// * [`TaxServiceError::InvalidInput`]: `month` outside 1–12.
    /// * [`TaxServiceError::NoTaxRecords`]: the user has no record set.
    /// * [`TaxServiceError::MonthNotFound`]: no record for that month.
    pub async fn tax_for_month(
        &self,
        user_id: i64,
        month: u32,
    ) -> Result<Decimal, TaxServiceError> {
        if !(1..=12).contains(&month) {
            return Err(AccumulatorError::InvalidMonth(month).into());
        }

        self.repo
            .get_tax_records(user_id)
            .await?
            .ok_or(TaxServiceError::NoTaxRecords(user_id))?
            .into_iter()
            .find(|record| record.month == month)
            .map(|record| record.tax)
            .ok_or(TaxServiceError::MonthNotFound { user_id, month })
    }

    /// Salary and tax totals for the year with the per-month breakdown.
    ///
    /// # Errors
    ///
    /// * [`TaxServiceError::UserNotFound`]: no such user.
    /// * [`TaxServiceError::NoTaxRecords`]: the user exists but has no
    ///   records.
    pub async fn annual_summary(
        &self,
        user_id: i64,
    ) -> Result<AnnualSummary, TaxServiceError> {
        let user = self.repo.get_user(user_id).await.map_err(|e| match e {
            RepositoryError::NotFound => TaxServiceError::UserNotFound(user_id),
            other => TaxServiceError::Repository(other),
        })?;

        let records = self
            .repo
            .get_tax_records(user_id)
            .await?
            .filter(|records| !records.is_empty())
            .ok_or(TaxServiceError::NoTaxRecords(user_id))?;

        Ok(AnnualSummary::from_records(user_id, user.email, records))
    }

    fn user_lock(
        &self,
        user_id: i64,
    ) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(user_id).or_default().clone()
    }

    // drops the user's guard once no other submission holds or awaits it
    fn release_user_lock(
        &self,
        user_id: i64,
    ) {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::InMemoryRepository;
    use crate::models::NewUser;

    // users 1 and 2 are registered
    async fn service() -> TaxService {
        let service = TaxService::new(Arc::new(InMemoryRepository::new()));
        for email in ["one@example.com", "two@example.com"] {
            service
                .repository()
                .create_user(NewUser::with_email(email))
                .await
                .expect("create user");
        }
        service
    }

    fn tracked_locks(service: &TaxService) -> usize {
        service.user_locks.lock().expect("lock map").len()
    }

    fn entries(pairs: &[(u32, Decimal)]) -> Vec<MonthSalary> {
        pairs
            .iter()
            .map(|(month, salary)| MonthSalary::new(*month, *salary))
            .collect()
    }

    const USER: i64 = 1;

    // =========================================================================
    // compute_and_save
    // =========================================================================

    #[tokio::test]
    async fn first_submission_creates_record_set() {
        let service = service().await;
        assert_eq!(service.repository().get_tax_records(USER).await, Ok(None));

        let saved = service
            .compute_and_save(USER, &entries(&[(1, dec!(41000)), (2, dec!(41000))]))
            .await
            .expect("save");

        assert_eq!(saved.len(), 2);
        assert_eq!(
            service.repository().get_tax_records(USER).await,
            Ok(Some(saved))
        );
    }

    #[tokio::test]
    async fn single_month_at_threshold_owes_nothing() {
        let service = service().await;
        service
            .compute_and_save(USER, &entries(&[(1, dec!(5000))]))
            .await
            .expect("save");

        assert_eq!(service.tax_for_month(USER, 1).await, Ok(dec!(0)));
    }

    #[tokio::test]
    async fn single_month_of_41000_owes_1080() {
        let service = service().await;
        service
            .compute_and_save(USER, &entries(&[(1, dec!(41000))]))
            .await
            .expect("save");

        assert_eq!(service.tax_for_month(USER, 1).await, Ok(dec!(1080.00)));
    }

    #[tokio::test]
    async fn fifth_month_attribution_across_brackets() {
        let service = service().await;
        service
            .compute_and_save(
                USER,
                &entries(&[
                    (1, dec!(41000)),
                    (2, dec!(113000)),
                    (3, dec!(161000)),
                    (4, dec!(125000)),
                    (5, dec!(245000)),
                ]),
            )
            .await
            .expect("save");

        assert_eq!(service.tax_for_month(USER, 5).await, Ok(dec!(72000)));
    }

    #[tokio::test]
    async fn later_partial_submission_keeps_month_one() {
        let service = service().await;
        service
            .compute_and_save(
                USER,
                &entries(&[(1, dec!(41000)), (2, dec!(41000)), (5, dec!(41000))]),
            )
            .await
            .expect("first save");
        let before = service.tax_for_month(USER, 1).await.expect("month 1");

        let saved = service
            .compute_and_save(USER, &entries(&[(3, dec!(41000)), (4, dec!(41000))]))
            .await
            .expect("second save");

        assert_eq!(service.tax_for_month(USER, 1).await, Ok(before));
        assert_eq!(before, dec!(1080));
        let months: Vec<_> = saved.iter().map(|record| record.month).collect();
        assert_eq!(months, vec![1, 2, 3, 4, 5]);
        // month 5 now sits on top of five months of income
        assert_eq!(service.tax_for_month(USER, 5).await, Ok(dec!(7200)));
    }

    #[tokio::test]
    async fn resubmitting_a_month_replaces_it() {
        let service = service().await;
        service
            .compute_and_save(USER, &entries(&[(1, dec!(41000)), (2, dec!(41000))]))
            .await
            .expect("first save");

        let saved = service
            .compute_and_save(USER, &entries(&[(1, dec!(5000))]))
            .await
            .expect("second save");

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].salary, dec!(5000));
        assert_eq!(saved[0].tax, dec!(0));
        assert_eq!(saved[1].tax, dec!(1080));
    }

    #[tokio::test]
    async fn duplicate_months_reject_the_whole_batch() {
        let service = service().await;

        let result = service
            .compute_and_save(USER, &entries(&[(1, dec!(41000)), (1, dec!(41000))]))
            .await;

        let err = result.expect_err("duplicates rejected");
        assert_eq!(
            err,
            TaxServiceError::InvalidInput(AccumulatorError::DuplicateMonths(vec![1]))
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(service.repository().get_tax_records(USER).await, Ok(None));
    }

    #[tokio::test]
    async fn rejected_batch_leaves_existing_records_untouched() {
        let service = service().await;
        let saved = service
            .compute_and_save(USER, &entries(&[(1, dec!(41000))]))
            .await
            .expect("first save");

        let result = service
            .compute_and_save(
                USER,
                &entries(&[(2, dec!(41000)), (3, dec!(1)), (2, dec!(50000))]),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            service.repository().get_tax_records(USER).await,
            Ok(Some(saved))
        );
    }

    #[tokio::test]
    async fn users_do_not_share_records() {
        let service = service().await;
        service
            .compute_and_save(1, &entries(&[(1, dec!(41000))]))
            .await
            .expect("save user 1");
        service
            .compute_and_save(2, &entries(&[(1, dec!(10000))]))
            .await
            .expect("save user 2");

        assert_eq!(service.tax_for_month(1, 1).await, Ok(dec!(1080)));
        assert_eq!(service.tax_for_month(2, 1).await, Ok(dec!(150)));
    }

    #[tokio::test]
    async fn concurrent_submissions_for_one_user_are_serialised() {
        let service = Arc::new(service().await);

        let handles: Vec<_> = (1..=6u32)
            .map(|month| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .compute_and_save(USER, &[MonthSalary::new(month, dec!(41000))])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("task").expect("save");
        }

        let summary_records = service
            .repository()
            .get_tax_records(USER)
            .await
            .expect("read")
            .expect("records");
        assert_eq!(summary_records.len(), 6);
        // months 1-5 as above, month 6 reaches 216000 cumulative taxable
        let taxes: Vec<_> = summary_records.iter().map(|record| record.tax).collect();
        assert_eq!(
            taxes,
            vec![
                dec!(1080),
                dec!(3600),
                dec!(3600),
                dec!(3600),
                dec!(7200),
                dec!(7200),
            ]
        );
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_creating_records() {
        let service = service().await;

        let err = service
            .compute_and_save(USER, &[])
            .await
            .expect_err("empty batch rejected");

        assert_eq!(
            err,
            TaxServiceError::InvalidInput(AccumulatorError::EmptySubmission)
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(service.repository().get_tax_records(USER).await, Ok(None));
        assert_eq!(
            service.tax_for_month(USER, 1).await,
            Err(TaxServiceError::NoTaxRecords(USER))
        );
    }

    #[tokio::test]
    async fn submission_for_unregistered_user_is_not_found() {
        let service = service().await;

        let err = service
            .compute_and_save(999, &entries(&[(1, dec!(41000))]))
            .await
            .expect_err("unknown user");

        assert_eq!(err, TaxServiceError::UserNotFound(999));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.repository().get_tax_records(999).await, Ok(None));
        assert_eq!(tracked_locks(&service), 0);
    }

    #[tokio::test]
    async fn user_guards_are_released_after_saving() {
        let service = Arc::new(service().await);
        service
            .compute_and_save(USER, &entries(&[(1, dec!(41000))]))
            .await
            .expect("save");
        assert_eq!(tracked_locks(&service), 0);

        let handles: Vec<_> = [1, 2, 1, 2]
            .into_iter()
            .zip(2..=5u32)
            .map(|(user_id, month)| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .compute_and_save(user_id, &[MonthSalary::new(month, dec!(41000))])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("task").expect("save");
        }

        assert_eq!(tracked_locks(&service), 0);
    }

    // =========================================================================
    // tax_for_month
    // =========================================================================

    #[tokio::test]
    async fn month_without_record_is_not_found() {
        let service = service().await;
        service
            .compute_and_save(
                USER,
                &entries(&[
                    (1, dec!(41000)),
                    (2, dec!(41000)),
                    (3, dec!(41000)),
                    (4, dec!(41000)),
                    (5, dec!(41000)),
                ]),
            )
            .await
            .expect("save");

        let err = service
            .tax_for_month(USER, 8)
            .await
            .expect_err("month 8 missing");

        assert_eq!(err, TaxServiceError::MonthNotFound { user_id: USER, month: 8 });
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn user_without_records_is_not_found() {
        let service = service().await;

        assert_eq!(
            service.tax_for_month(USER, 1).await,
            Err(TaxServiceError::NoTaxRecords(USER))
        );
    }

    #[tokio::test]
    async fn out_of_range_month_is_invalid_input() {
        let service = service().await;

        let err = service.tax_for_month(USER, 13).await.expect_err("invalid");

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // =========================================================================
    // annual_summary
    // =========================================================================

    #[tokio::test]
    async fn annual_summary_totals_salary_and_tax() {
        let service = service().await;
        let user = service
            .repository()
            .create_user(NewUser::with_email("initial@example.com"))
            .await
            .expect("create user");
        service
            .compute_and_save(user.id, &entries(&[(1, dec!(41000)), (2, dec!(41000))]))
            .await
            .expect("save");

        let summary = service.annual_summary(user.id).await.expect("summary");

        assert_eq!(summary.email, "initial@example.com");
        assert_eq!(summary.total_salary, dec!(82000));
        assert_eq!(summary.total_tax, dec!(4680.00));
        assert_eq!(summary.per_month.len(), 2);
        assert_eq!(summary.per_month[0].tax, dec!(1080));
        assert_eq!(summary.per_month[1].tax, dec!(3600));
    }

    #[tokio::test]
    async fn annual_summary_for_missing_user_is_not_found() {
        let service = service().await;

        let err = service.annual_summary(99).await.expect_err("no user");

        assert_eq!(err, TaxServiceError::UserNotFound(99));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn annual_summary_for_user_without_records_is_not_found() {
        let service = service().await;
        let user = service
            .repository()
            .create_user(NewUser::with_email("initial@example.com"))
            .await
            .expect("create user");

        assert_eq!(
            service.annual_summary(user.id).await,
            Err(TaxServiceError::NoTaxRecords(user.id))
        );
    }

    #[test]
    fn storage_errors_classify_as_storage() {
        let err = TaxServiceError::from(RepositoryError::Database("boom".to_string()));

        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
