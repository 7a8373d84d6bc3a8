//! Loan ledger service

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, LoanQuery, OpenLoan},
    repository::{audit::operation_id, with_retry, with_write_retry, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    overdue_after_days: i64,
}

impl LoansService {
    pub fn new(repository: Repository, overdue_after_days: i64) -> Self {
        Self {
            repository,
            overdue_after_days,
        }
    }

    /// Loans opened before this instant are overdue while still open
    pub fn overdue_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.overdue_after_days)
    }

    /// Lend a device to a supervisor
    pub async fn open_loan(&self, data: OpenLoan) -> AppResult<Loan> {
        data.validate()?;
        let op = operation_id();
        with_write_retry(
            "open_loan",
            || self.repository.loans.open(&op, &data),
            || self.landed_loan(&op),
        )
        .await
    }

    /// Return the device of an open loan
    pub async fn close_loan(&self, loan_id: &str) -> AppResult<Loan> {
        let op = operation_id();
        with_write_retry(
            "close_loan",
            || self.repository.loans.close(&op, loan_id),
            || self.landed_loan(&op),
        )
        .await
    }

    /// Return a device by its scanned identifier
    pub async fn close_loan_by_device(&self, device_id: &str) -> AppResult<Loan> {
        let op_id = operation_id();
        let op = op_id.as_str();
        with_write_retry(
            "close_loan_by_device",
            || async move {
                let loan_id = self
                    .repository
                    .loans
                    .open_loan_for_device(device_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Device {} has no open loan", device_id))
                    })?;
                self.repository.loans.close(op, &loan_id).await
            },
            || self.landed_loan(op),
        )
        .await
    }

    /// Loan written by `op`, if that write committed
    async fn landed_loan(&self, op: &str) -> AppResult<Option<Loan>> {
        self.repository
            .audit
            .landed_then(op, |id| async move { self.repository.loans.get_by_id(&id).await })
            .await
    }

    pub async fn get_loan(&self, loan_id: &str) -> AppResult<LoanDetails> {
        let row = with_retry("get_loan", || self.repository.loans.get_details(loan_id)).await?;
        Ok(row.into_details(Utc::now(), self.overdue_after_days))
    }

    /// Every open loan, oldest first
    pub async fn list_open_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let rows = with_retry("list_open_loans", || self.repository.loans.list_open()).await?;
        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|r| r.into_details(now, self.overdue_after_days))
            .collect())
    }

    /// Open loans past the overdue threshold, oldest first
    pub async fn list_overdue_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let cutoff = self.overdue_cutoff(now);
        let rows =
            with_retry("list_overdue_loans", || self.repository.loans.list_overdue(cutoff)).await?;
        Ok(rows
            .into_iter()
            .map(|r| r.into_details(now, self.overdue_after_days))
            .collect())
    }

    /// Loan history with filters, newest first
    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let now = Utc::now();
        let cutoff = self.overdue_cutoff(now);
        let (rows, total) =
            with_retry("list_loans", || self.repository.loans.search(query, cutoff)).await?;
        let loans = rows
            .into_iter()
            .map(|r| r.into_details(now, self.overdue_after_days))
            .collect();
        Ok((loans, total))
    }

    pub async fn count_active(&self) -> AppResult<i64> {
        with_retry("count_active_loans", || self.repository.loans.count_active()).await
    }
}
