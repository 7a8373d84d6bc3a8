//! Devices repository for database operations

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::audit::{self, AuditRecord};
use crate::{
    error::{foreign_key_violation, unique_violation, AppError, AppResult},
    models::audit::{AuditAction, AuditEntity},
    models::device::{
        CreateDevice, Device, DeviceEvent, DeviceMovement, DeviceQuery, DeviceStatus, UpdateDevice,
    },
    models::{contains_pattern, page_bounds},
};

const DEVICE_SELECT: &str = r#"
    SELECT d.id, d.name, d.category, d.status, d.last_maintenance_date, d.location,
           d.supervisor_id, s.name AS supervisor_name, d.created_at, d.updated_at
    FROM devices d
    LEFT JOIN supervisors s ON s.id = d.supervisor_id
"#;

/// Lock the device row for the rest of the transaction and return its status
pub(crate) async fn lock_status(conn: &mut PgConnection, id: &str) -> AppResult<DeviceStatus> {
    sqlx::query_scalar::<_, DeviceStatus>("SELECT status FROM devices WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
}

pub(crate) async fn set_status(
    conn: &mut PgConnection,
    id: &str,
    status: DeviceStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE devices SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Full device row read inside a transaction; `FOR UPDATE OF d` when `lock`
pub(crate) async fn fetch_device(
    conn: &mut PgConnection,
    id: &str,
    lock: bool,
) -> AppResult<Device> {
    let suffix = if lock { " FOR UPDATE OF d" } else { "" };
    sqlx::query_as::<_, Device>(&format!("{} WHERE d.id = $1{}", DEVICE_SELECT, suffix))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
}

fn device_audit<'a>(operation_id: &'a str, device: &'a Device, action: AuditAction) -> AuditRecord<'a> {
    AuditRecord {
        operation_id,
        entity: AuditEntity::Device,
        record_id: &device.id,
        action,
        supervisor_id: device.supervisor_id.as_deref(),
    }
}

fn supervisor_missing(supervisor_id: Option<&str>) -> AppError {
    AppError::NotFound(format!(
        "Supervisor {} not found",
        supervisor_id.unwrap_or_default()
    ))
}

#[derive(Clone)]
pub struct DevicesRepository {
    pool: Pool<Postgres>,
}

impl DevicesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get device by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Device> {
        sqlx::query_as::<_, Device>(&format!("{} WHERE d.id = $1", DEVICE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
    }

    pub async fn exists(&self, id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM devices WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Search devices with filters and pagination
    pub async fn search(&self, query: &DeviceQuery) -> AppResult<(Vec<Device>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("d.status = ${}", params.len()));
        }

        if let Some(ref category) = query.category {
            params.push(category.clone());
            conditions.push(format!("d.category = ${}", params.len()));
        }

        if let Some(ref supervisor_id) = query.supervisor_id {
            params.push(supervisor_id.clone());
            conditions.push(format!("d.supervisor_id = ${}", params.len()));
        }

        if let Some(ref name) = query.name {
            params.push(contains_pattern(name));
            conditions.push(format!(
                r"(LOWER(d.name) LIKE ${} ESCAPE '\' OR LOWER(d.id) LIKE ${} ESCAPE '\')",
                params.len(),
                params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM devices d {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY d.name, d.id LIMIT {} OFFSET {}",
            DEVICE_SELECT, where_clause, limit, offset
        );
        let mut select_builder = sqlx::query_as::<_, Device>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let devices = select_builder.fetch_all(&self.pool).await?;

        Ok((devices, total))
    }

    /// All devices currently in `status`
    pub async fn list_by_status(&self, status: DeviceStatus) -> AppResult<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            "{} WHERE d.status = $1 ORDER BY d.updated_at",
            DEVICE_SELECT
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(devices)
    }

    /// Create a device with the given initial status
    pub async fn create(
        &self,
        operation_id: &str,
        data: &CreateDevice,
        status: DeviceStatus,
    ) -> AppResult<Device> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO devices (id, name, category, status, last_maintenance_date, location, supervisor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&data.id)
        .bind(&data.name)
        .bind(&data.category)
        .bind(status)
        .bind(data.last_maintenance_date)
        .bind(&data.location)
        .bind(&data.supervisor_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e).is_some() {
                AppError::DuplicateKey(format!("Device {} already exists", data.id))
            } else if foreign_key_violation(&e) {
                supervisor_missing(data.supervisor_id.as_deref())
            } else {
                e.into()
            }
        })?;

        let device = fetch_device(&mut tx, &data.id, false).await?;
        audit::record(
            &mut tx,
            device_audit(operation_id, &device, AuditAction::Create),
            None,
            Some(&device),
        )
        .await?;

        tx.commit().await?;
        Ok(device)
    }

    /// Update descriptive fields; a move to a new location is appended to the
    /// movement history. Nullable fields sent as `null` are cleared.
    pub async fn update(
        &self,
        operation_id: &str,
        id: &str,
        data: &UpdateDevice,
    ) -> AppResult<Device> {
        let mut tx = self.pool.begin().await?;

        let previous = fetch_device(&mut tx, id, true).await?;
        let previous_location = previous.location.clone();

        let mut sets = vec!["updated_at = NOW()".to_string()];
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
        add_field!(data.category, "category");
        add_field!(data.last_maintenance_date, "last_maintenance_date");
        add_field!(data.location, "location");
        add_field!(data.supervisor_id, "supervisor_id");

        let query = format!("UPDATE devices SET {} WHERE id = ${}", sets.join(", "), idx);

        let mut builder = sqlx::query(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.last_maintenance_date);
        bind_field!(data.location);
        bind_field!(data.supervisor_id);

        builder.bind(id).execute(&mut *tx).await.map_err(|e| {
            if foreign_key_violation(&e) {
                supervisor_missing(data.supervisor_id.as_ref().and_then(Option::as_deref))
            } else {
                AppError::from(e)
            }
        })?;

        if let Some(Some(ref new_location)) = data.location {
            if previous_location.as_deref() != Some(new_location.as_str()) {
                sqlx::query(
                    r#"
                    INSERT INTO device_movements (id, device_id, previous_location, new_location, supervisor_id)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(id)
                .bind(&previous_location)
                .bind(new_location)
                .bind(&data.moved_by)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if foreign_key_violation(&e) {
                        supervisor_missing(data.moved_by.as_deref())
                    } else {
                        AppError::from(e)
                    }
                })?;

                tracing::info!(
                    device_id = id,
                    from = previous_location.as_deref().unwrap_or("-"),
                    to = new_location.as_str(),
                    "Device moved"
                );
            }
        }

        let device = fetch_device(&mut tx, id, false).await?;
        let mut entry = device_audit(operation_id, &device, AuditAction::Update);
        if data.moved_by.is_some() {
            entry.supervisor_id = data.moved_by.as_deref();
        }
        audit::record(&mut tx, entry, Some(&previous), Some(&device)).await?;

        tx.commit().await?;
        Ok(device)
    }

    /// Move a device through a maintenance transition
    pub async fn apply_maintenance(
        &self,
        operation_id: &str,
        id: &str,
        event: DeviceEvent,
    ) -> AppResult<Device> {
        let mut tx = self.pool.begin().await?;

        let previous = fetch_device(&mut tx, id, true).await?;
        let next = previous.status.apply(event)?;

        set_status(&mut tx, id, next).await?;

        let action = if event == DeviceEvent::FinishMaintenance {
            sqlx::query("UPDATE devices SET last_maintenance_date = CURRENT_DATE WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            AuditAction::MaintenanceFinish
        } else {
            AuditAction::MaintenanceStart
        };

        let device = fetch_device(&mut tx, id, false).await?;
        audit::record(
            &mut tx,
            device_audit(operation_id, &device, action),
            Some(&previous),
            Some(&device),
        )
        .await?;

        tx.commit().await?;
        Ok(device)
    }

    /// Delete a device that has never been lent
    pub async fn delete(&self, operation_id: &str, id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let previous = fetch_device(&mut tx, id, true).await?;

        let loan_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE device_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if loan_count > 0 {
            return Err(AppError::InvalidState(format!(
                "Device {} is referenced by {} loan(s) and cannot be deleted",
                id, loan_count
            )));
        }

        sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut tx,
            device_audit(operation_id, &previous, AuditAction::Delete),
            Some(&previous),
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Location history of a device, newest first
    pub async fn movements(&self, id: &str) -> AppResult<Vec<DeviceMovement>> {
        let movements = sqlx::query_as::<_, DeviceMovement>(
            r#"
            SELECT id, device_id, previous_location, new_location, moved_at, supervisor_id
            FROM device_movements
            WHERE device_id = $1
            ORDER BY moved_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}
