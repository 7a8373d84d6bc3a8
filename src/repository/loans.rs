//! Loan ledger: the only writer of loan rows and of the in_use status

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    audit::{self, AuditRecord},
    devices::{lock_status, set_status},
};
use crate::{
    error::{unique_violation, AppError, AppResult},
    models::audit::{AuditAction, AuditEntity},
    models::device::DeviceEvent,
    models::loan::{Loan, LoanQuery, LoanRow, LoanState, OpenLoan},
    models::page_bounds,
};

/// Partial unique index allowing one open loan per device
const OPEN_LOAN_INDEX: &str = "loans_one_open_per_device";

const LOAN_SELECT: &str = r#"
    SELECT l.id, l.device_id, d.name AS device_name,
           l.supervisor_id, s.name AS supervisor_name,
           l.loan_date, l.return_date,
           COALESCE(l.location, d.location) AS location, l.notes
    FROM loans l
    JOIN devices d ON d.id = l.device_id
    JOIN supervisors s ON s.id = l.supervisor_id
"#;

/// Append WHERE conditions for `query`; `overdue_cutoff` is `now - threshold`
fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &LoanQuery,
    overdue_cutoff: DateTime<Utc>,
) {
    builder.push(" WHERE 1=1");

    if let Some(ref device_id) = query.device_id {
        builder.push(" AND l.device_id = ");
        builder.push_bind(device_id.clone());
    }

    if let Some(ref supervisor_id) = query.supervisor_id {
        builder.push(" AND l.supervisor_id = ");
        builder.push_bind(supervisor_id.clone());
    }

    match query.state.unwrap_or_default() {
        LoanState::Open => {
            builder.push(" AND l.return_date IS NULL");
        }
        LoanState::Closed => {
            builder.push(" AND l.return_date IS NOT NULL");
        }
        LoanState::All => {}
    }

    if query.overdue.unwrap_or(false) {
        builder.push(" AND l.return_date IS NULL AND l.loan_date < ");
        builder.push_bind(overdue_cutoff);
    }
}

fn loan_audit<'a>(operation_id: &'a str, loan: &'a Loan, action: AuditAction) -> AuditRecord<'a> {
    AuditRecord {
        operation_id,
        entity: AuditEntity::Loan,
        record_id: &loan.id,
        action,
        supervisor_id: Some(&loan.supervisor_id),
    }
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Get loan with device and supervisor names
    pub async fn get_details(&self, id: &str) -> AppResult<LoanRow> {
        sqlx::query_as::<_, LoanRow>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Id of the open loan on a device, if any
    pub async fn open_loan_for_device(&self, device_id: &str) -> AppResult<Option<String>> {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM loans WHERE device_id = $1 AND return_date IS NULL",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Open a loan: insert the loan row and flip the device to in_use.
    ///
    /// The device row is locked first, so of two concurrent calls on one
    /// device the second sees `in_use` and fails with `InvalidState`.
    pub async fn open(&self, operation_id: &str, data: &OpenLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let status = lock_status(&mut tx, &data.device_id).await?;

        let supervisor_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM supervisors WHERE id = $1)")
                .bind(&data.supervisor_id)
                .fetch_one(&mut *tx)
                .await?;
        if !supervisor_exists {
            return Err(AppError::NotFound(format!(
                "Supervisor {} not found",
                data.supervisor_id
            )));
        }

        let next = status.apply(DeviceEvent::Lend)?;

        let open_loan: Option<String> = sqlx::query_scalar(
            "SELECT id FROM loans WHERE device_id = $1 AND return_date IS NULL",
        )
        .bind(&data.device_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(loan_id) = open_loan {
            return Err(AppError::InvalidState(format!(
                "Device {} already has open loan {}",
                data.device_id, loan_id
            )));
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (id, device_id, supervisor_id, loan_date, location, notes)
            VALUES ($1, $2, $3, NOW(), $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&data.device_id)
        .bind(&data.supervisor_id)
        .bind(&data.location)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e).as_deref() {
            Some(OPEN_LOAN_INDEX) => AppError::InvalidState(format!(
                "Device {} already has an open loan",
                data.device_id
            )),
            _ => AppError::from(e),
        })?;

        set_status(&mut tx, &data.device_id, next).await?;

        audit::record(
            &mut tx,
            loan_audit(operation_id, &loan, AuditAction::Lend),
            None,
            Some(&loan),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            device_id = %loan.device_id,
            supervisor_id = %loan.supervisor_id,
            "Loan opened"
        );

        Ok(loan)
    }

    /// Close an open loan: set its return date and flip the device back to available
    pub async fn close(&self, operation_id: &str, loan_id: &str) -> AppResult<Loan> {
        let not_open = || AppError::NotFound(format!("No open loan with id {}", loan_id));

        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND return_date IS NULL",
        )
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_open)?;
        let device_id = previous.device_id.clone();

        // Same lock order as `open`: device row first
        let status = lock_status(&mut tx, &device_id).await?;
        let next = status.apply(DeviceEvent::Return)?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET return_date = NOW()
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_open)?;

        set_status(&mut tx, &device_id, next).await?;

        audit::record(
            &mut tx,
            loan_audit(operation_id, &loan, AuditAction::Return),
            Some(&previous),
            Some(&loan),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(loan_id = %loan.id, device_id = %loan.device_id, "Loan closed");

        Ok(loan)
    }

    /// Search loans with filters and pagination, newest first
    pub async fn search(
        &self,
        query: &LoanQuery,
        overdue_cutoff: DateTime<Utc>,
    ) -> AppResult<(Vec<LoanRow>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut count_builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM loans l",
        );
        push_filters(&mut count_builder, query, overdue_cutoff);
        let (total,): (i64,) = count_builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new(LOAN_SELECT);
        push_filters(&mut builder, query, overdue_cutoff);
        builder.push(" ORDER BY l.loan_date DESC, l.id LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows: Vec<LoanRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Every open loan, oldest first
    pub async fn list_open(&self) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.return_date IS NULL ORDER BY l.loan_date",
            LOAN_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Open loans started before `cutoff`, oldest first
    pub async fn list_overdue(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} WHERE l.return_date IS NULL AND l.loan_date < $1 ORDER BY l.loan_date",
            LOAN_SELECT
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
