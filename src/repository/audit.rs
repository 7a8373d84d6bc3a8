//! Audit log repository

use std::future::Future;

use serde::Serialize;
use sqlx::{types::Json, PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::audit::{AuditAction, AuditEntity, AuditEntry, AuditQuery},
    models::page_bounds,
};

/// Id for one write operation. It becomes the id of the audit entry the
/// write commits, so a retry can tell whether an earlier attempt landed.
pub fn operation_id() -> String {
    Uuid::new_v4().to_string()
}

/// What a write is about to record
pub(crate) struct AuditRecord<'a> {
    pub operation_id: &'a str,
    pub entity: AuditEntity,
    pub record_id: &'a str,
    pub action: AuditAction,
    pub supervisor_id: Option<&'a str>,
}

/// Append an entry inside the caller's transaction
pub(crate) async fn record<T>(
    conn: &mut PgConnection,
    entry: AuditRecord<'_>,
    previous: Option<&T>,
    new: Option<&T>,
) -> AppResult<()>
where
    T: Serialize + Sync,
{
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, entity, record_id, action, supervisor_id, previous_data, new_data)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.operation_id)
    .bind(entry.entity)
    .bind(entry.record_id)
    .bind(entry.action)
    .bind(entry.supervisor_id)
    .bind(previous.map(Json))
    .bind(new.map(Json))
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        operation_id = entry.operation_id,
        entity = entry.entity.as_str(),
        record_id = entry.record_id,
        action = %entry.action,
        "Audit entry recorded"
    );
    Ok(())
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: Pool<Postgres>,
}

impl AuditRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record id touched by the operation, if that operation committed
    pub async fn landed(&self, operation_id: &str) -> AppResult<Option<String>> {
        let record_id: Option<String> =
            sqlx::query_scalar("SELECT record_id FROM audit_log WHERE id = $1")
                .bind(operation_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record_id)
    }

    /// When the operation committed, load what it produced with `fetch`
    pub async fn landed_then<T, F, Fut>(&self, operation_id: &str, fetch: F) -> AppResult<Option<T>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.landed(operation_id).await? {
            Some(record_id) => fetch(record_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Entries concerning a supervisor, newest first
    pub async fn list_for_supervisor(
        &self,
        supervisor_id: &str,
        query: &AuditQuery,
    ) -> AppResult<(Vec<AuditEntry>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE supervisor_id = $1")
                .bind(supervisor_id)
                .fetch_one(&self.pool)
                .await?;

        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, entity, record_id, action, supervisor_id, recorded_at,
                   previous_data, new_data
            FROM audit_log
            WHERE supervisor_id = $1
            ORDER BY recorded_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(supervisor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((entries, total))
    }
}
