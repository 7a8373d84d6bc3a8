//! Device registry endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::device::{CreateDevice, Device, DeviceMovement, DeviceQuery, UpdateDevice},
    AppState,
};

use super::PaginatedResponse;

/// List devices with filters and pagination
#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    params(DeviceQuery),
    responses(
        (status = 200, description = "List of devices", body = PaginatedResponse<Device>)
    )
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<Json<PaginatedResponse<Device>>> {
    let (devices, total) = state.services.devices.list_devices(&query).await?;
    Ok(Json(PaginatedResponse::new(devices, total, query.page, query.per_page)))
}

/// Get device details by ID
#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device details", body = Device),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.get_device(&id).await?;
    Ok(Json(device))
}

/// Register a new device
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    request_body = CreateDevice,
    responses(
        (status = 201, description = "Device created", body = Device),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Supervisor not found"),
        (status = 409, description = "Device already exists"),
        (status = 422, description = "Initial status not allowed")
    )
)]
pub async fn create_device(
    State(state): State<AppState>,
    Json(data): Json<CreateDevice>,
) -> AppResult<(StatusCode, Json<Device>)> {
    let device = state.services.devices.create_device(data).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Update descriptive fields of a device
#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    request_body = UpdateDevice,
    responses(
        (status = 200, description = "Device updated", body = Device),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Device not found")
    )
)]
pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<UpdateDevice>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.update_device(&id, data).await?;
    Ok(Json(device))
}

/// Delete a device that has no loan history
#[utoipa::path(
    delete,
    path = "/devices/{id}",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Device has loan history")
    )
)]
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.devices.delete_device(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Put an available device under maintenance
#[utoipa::path(
    post,
    path = "/devices/{id}/maintenance",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Maintenance started", body = Device),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Device is not available")
    )
)]
pub async fn start_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.start_maintenance(&id).await?;
    Ok(Json(device))
}

/// Bring a device back from maintenance
#[utoipa::path(
    delete,
    path = "/devices/{id}/maintenance",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Maintenance finished", body = Device),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Device is not under maintenance")
    )
)]
pub async fn finish_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.finish_maintenance(&id).await?;
    Ok(Json(device))
}

/// Location history of a device
#[utoipa::path(
    get,
    path = "/devices/{id}/movements",
    tag = "devices",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Movements, newest first", body = Vec<DeviceMovement>),
        (status = 404, description = "Device not found")
    )
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<DeviceMovement>>> {
    let movements = state.services.devices.list_movements(&id).await?;
    Ok(Json(movements))
}
