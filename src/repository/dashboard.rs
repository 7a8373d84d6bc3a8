//! Aggregate queries behind the dashboard

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::dashboard::{ActivityEntry, CategoryCount, StatusCounts},
    models::device::DeviceStatus,
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: Pool<Postgres>,
}

impl DashboardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Device counts per status; statuses without devices count as zero
    pub async fn status_counts(&self) -> AppResult<StatusCounts> {
        let rows: Vec<(DeviceStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM devices GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status {
                DeviceStatus::Available => counts.available = count,
                DeviceStatus::InUse => counts.in_use = count,
                DeviceStatus::Maintenance => counts.maintenance = count,
            }
        }
        Ok(counts)
    }

    /// Device counts per category, largest first
    pub async fn category_counts(&self) -> AppResult<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT COALESCE(NULLIF(TRIM(category), ''), 'uncategorized') AS category,
                   COUNT(*) AS count
            FROM devices
            GROUP BY 1
            ORDER BY count DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Latest loan and return events, newest first
    pub async fn recent_activity(&self, limit: i64) -> AppResult<Vec<ActivityEntry>> {
        let rows = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT * FROM (
                SELECT l.id AS loan_id, l.device_id, d.name AS device_name,
                       s.name AS supervisor_name, 'loaned' AS kind, l.loan_date AS at
                FROM loans l
                JOIN devices d ON d.id = l.device_id
                JOIN supervisors s ON s.id = l.supervisor_id
                UNION ALL
                SELECT l.id, l.device_id, d.name, s.name, 'returned', l.return_date
                FROM loans l
                JOIN devices d ON d.id = l.device_id
                JOIN supervisors s ON s.id = l.supervisor_id
                WHERE l.return_date IS NOT NULL
            ) events
            ORDER BY at DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
