//! Supervisors repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use super::audit::{self, AuditRecord};
use crate::{
    error::{unique_violation, AppError, AppResult},
    models::audit::{AuditAction, AuditEntity},
    models::{contains_pattern, page_bounds},
    models::supervisor::{
        CreateSupervisor, Supervisor, SupervisorQuery, SupervisorShort,
        UpdateSupervisor,
    },
};

const EMAIL_CONSTRAINT: &str = "supervisors_email_key";

/// Translate a unique violation into the field that collided
fn duplicate_error(e: sqlx::Error, id: &str, email: Option<&str>) -> AppError {
    match unique_violation(&e).as_deref() {
        Some(EMAIL_CONSTRAINT) => AppError::DuplicateKey(format!(
            "Email {} is already registered",
            email.unwrap_or_default()
        )),
        Some(_) => AppError::DuplicateKey(format!("Supervisor {} already exists", id)),
        None => e.into(),
    }
}

const SUPERVISOR_COLUMNS: &str = "id, name, email, phone, permission_level, registration_date";

/// Supervisor row locked for the rest of the transaction
async fn lock_supervisor(conn: &mut PgConnection, id: &str) -> AppResult<Supervisor> {
    sqlx::query_as::<_, Supervisor>(&format!(
        "SELECT {} FROM supervisors WHERE id = $1 FOR UPDATE",
        SUPERVISOR_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Supervisor {} not found", id)))
}

fn supervisor_audit<'a>(
    operation_id: &'a str,
    supervisor: &'a Supervisor,
    action: AuditAction,
) -> AuditRecord<'a> {
    AuditRecord {
        operation_id,
        entity: AuditEntity::Supervisor,
        record_id: &supervisor.id,
        action,
        supervisor_id: Some(&supervisor.id),
    }
}

#[derive(Clone)]
pub struct SupervisorsRepository {
    pool: Pool<Postgres>,
}

impl SupervisorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get supervisor by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Supervisor> {
        sqlx::query_as::<_, Supervisor>(&format!(
            "SELECT {} FROM supervisors WHERE id = $1",
            SUPERVISOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Supervisor {} not found", id)))
    }

    /// Search supervisors with filters and pagination
    pub async fn search(&self, query: &SupervisorQuery) -> AppResult<(Vec<SupervisorShort>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(level) = query.permission_level {
            params.push(level.as_str().to_string());
            conditions.push(format!("s.permission_level = ${}", params.len()));
        }

        if let Some(ref name) = query.name {
            params.push(contains_pattern(name));
            conditions.push(format!(
                r"(LOWER(s.name) LIKE ${} ESCAPE '\' OR LOWER(s.email) LIKE ${} ESCAPE '\')",
                params.len(),
                params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM supervisors s {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT s.id, s.name, s.email, s.phone, s.permission_level,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.supervisor_id = s.id AND l.return_date IS NULL) AS open_loans
            FROM supervisors s
            {}
            ORDER BY s.name, s.id
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );
        let mut select_builder = sqlx::query_as::<_, SupervisorShort>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let supervisors = select_builder.fetch_all(&self.pool).await?;

        Ok((supervisors, total))
    }

    /// Create a supervisor
    pub async fn create(&self, operation_id: &str, data: &CreateSupervisor) -> AppResult<Supervisor> {
        let mut tx = self.pool.begin().await?;

        let supervisor = sqlx::query_as::<_, Supervisor>(&format!(
            r#"
            INSERT INTO supervisors (id, name, email, phone, permission_level, registration_date)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {}
            "#,
            SUPERVISOR_COLUMNS
        ))
        .bind(&data.id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.permission_level.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_error(e, &data.id, Some(&data.email)))?;

        audit::record(
            &mut tx,
            supervisor_audit(operation_id, &supervisor, AuditAction::Create),
            None,
            Some(&supervisor),
        )
        .await?;

        tx.commit().await?;
        Ok(supervisor)
    }

    /// Update supervisor; `phone: Some(None)` clears the phone number
    pub async fn update(
        &self,
        operation_id: &str,
        id: &str,
        data: &UpdateSupervisor,
    ) -> AppResult<Supervisor> {
        let mut sets = Vec::new();
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.email, "email");
        add_field!(data.phone, "phone");
        add_field!(data.permission_level, "permission_level");

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut tx = self.pool.begin().await?;
        let previous = lock_supervisor(&mut tx, id).await?;

        let query = format!(
            "UPDATE supervisors SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            idx,
            SUPERVISOR_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Supervisor>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.email);
        bind_field!(data.phone);
        bind_field!(data.permission_level);

        let supervisor = builder
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| duplicate_error(e, id, data.email.as_deref()))?;

        audit::record(
            &mut tx,
            supervisor_audit(operation_id, &supervisor, AuditAction::Update),
            Some(&previous),
            Some(&supervisor),
        )
        .await?;

        tx.commit().await?;
        Ok(supervisor)
    }

    /// Delete a supervisor without loan history; devices assigned to them are unassigned
    pub async fn delete(&self, operation_id: &str, id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let previous = lock_supervisor(&mut tx, id).await?;

        let loan_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE supervisor_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if loan_count > 0 {
            return Err(AppError::InvalidState(format!(
                "Supervisor {} is referenced by {} loan(s) and cannot be deleted",
                id, loan_count
            )));
        }

        let unassigned = sqlx::query(
            "UPDATE devices SET supervisor_id = NULL, updated_at = NOW() WHERE supervisor_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM supervisors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut tx,
            supervisor_audit(operation_id, &previous, AuditAction::Delete),
            Some(&previous),
            None,
        )
        .await?;

        tx.commit().await?;

        if unassigned > 0 {
            tracing::info!(supervisor_id = id, devices = unassigned, "Devices unassigned from deleted supervisor");
        }
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM supervisors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
