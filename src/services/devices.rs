//! Device registry service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::device::{
        CreateDevice, Device, DeviceEvent, DeviceMovement, DeviceQuery, DeviceStatus, UpdateDevice,
    },
    repository::{audit::operation_id, with_retry, with_write_retry, Repository},
};

/// Status a new device starts in; `in_use` is reserved to the loan ledger
pub fn initial_status(requested: Option<DeviceStatus>) -> AppResult<DeviceStatus> {
    match requested.unwrap_or(DeviceStatus::Available) {
        DeviceStatus::InUse => Err(AppError::InvalidState(
            "A device can only become in_use by opening a loan".to_string(),
        )),
        status => Ok(status),
    }
}

#[derive(Clone)]
pub struct DevicesService {
    repository: Repository,
}

impl DevicesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_device(&self, id: &str) -> AppResult<Device> {
        with_retry("get_device", || self.repository.devices.get_by_id(id)).await
    }

    pub async fn list_devices(&self, query: &DeviceQuery) -> AppResult<(Vec<Device>, i64)> {
        with_retry("list_devices", || self.repository.devices.search(query)).await
    }

    /// Register a new device
    pub async fn create_device(&self, data: CreateDevice) -> AppResult<Device> {
        data.validate()?;
        let status = initial_status(data.status)?;

        let op = operation_id();
        let device = with_write_retry(
            "create_device",
            || self.repository.devices.create(&op, &data, status),
            || self.landed_device(&op),
        )
        .await?;
        tracing::info!(device_id = %device.id, status = %device.status, "Device created");
        Ok(device)
    }

    /// Edit descriptive fields of a device
    pub async fn update_device(&self, id: &str, data: UpdateDevice) -> AppResult<Device> {
        data.validate()?;
        let op = operation_id();
        with_write_retry(
            "update_device",
            || self.repository.devices.update(&op, id, &data),
            || self.landed_device(&op),
        )
        .await
    }

    pub async fn delete_device(&self, id: &str) -> AppResult<()> {
        let op = operation_id();
        with_write_retry(
            "delete_device",
            || self.repository.devices.delete(&op, id),
            || self.repository.audit.landed_then(&op, |_| async { Ok(()) }),
        )
        .await?;
        tracing::info!(device_id = id, "Device deleted");
        Ok(())
    }

    /// available -> maintenance
    pub async fn start_maintenance(&self, id: &str) -> AppResult<Device> {
        let device = self
            .apply_maintenance("start_maintenance", id, DeviceEvent::StartMaintenance)
            .await?;
        tracing::info!(device_id = id, "Maintenance started");
        Ok(device)
    }

    /// maintenance -> available, stamping today's date
    pub async fn finish_maintenance(&self, id: &str) -> AppResult<Device> {
        let device = self
            .apply_maintenance("finish_maintenance", id, DeviceEvent::FinishMaintenance)
            .await?;
        tracing::info!(device_id = id, "Maintenance finished");
        Ok(device)
    }

    async fn apply_maintenance(
        &self,
        operation: &str,
        id: &str,
        event: DeviceEvent,
    ) -> AppResult<Device> {
        let op = operation_id();
        with_write_retry(
            operation,
            || self.repository.devices.apply_maintenance(&op, id, event),
            || self.landed_device(&op),
        )
        .await
    }

    /// Device written by `op`, if that write committed
    async fn landed_device(&self, op: &str) -> AppResult<Option<Device>> {
        self.repository
            .audit
            .landed_then(op, |id| async move { self.repository.devices.get_by_id(&id).await })
            .await
    }

    pub async fn list_movements(&self, id: &str) -> AppResult<Vec<DeviceMovement>> {
        with_retry("list_movements", || async move {
            if !self.repository.devices.exists(id).await? {
                return Err(AppError::NotFound(format!("Device {} not found", id)));
            }
            self.repository.devices.movements(id).await
        })
        .await
    }
}
