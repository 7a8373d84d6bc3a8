//! Supervisor registry endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::audit::{AuditEntry, AuditQuery},
    models::supervisor::{
        CreateSupervisor, Supervisor, SupervisorQuery, SupervisorShort, UpdateSupervisor,
    },
    AppState,
};

use super::PaginatedResponse;

/// List supervisors with their open loan counts
#[utoipa::path(
    get,
    path = "/supervisors",
    tag = "supervisors",
    params(SupervisorQuery),
    responses(
        (status = 200, description = "List of supervisors", body = PaginatedResponse<SupervisorShort>)
    )
)]
pub async fn list_supervisors(
    State(state): State<AppState>,
    Query(query): Query<SupervisorQuery>,
) -> AppResult<Json<PaginatedResponse<SupervisorShort>>> {
    let (supervisors, total) = state.services.supervisors.list_supervisors(&query).await?;
    Ok(Json(PaginatedResponse::new(supervisors, total, query.page, query.per_page)))
}

/// Get supervisor by ID
#[utoipa::path(
    get,
    path = "/supervisors/{id}",
    tag = "supervisors",
    params(
        ("id" = String, Path, description = "Supervisor ID")
    ),
    responses(
        (status = 200, description = "Supervisor details", body = Supervisor),
        (status = 404, description = "Supervisor not found")
    )
)]
pub async fn get_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Supervisor>> {
    let supervisor = state.services.supervisors.get_supervisor(&id).await?;
    Ok(Json(supervisor))
}

/// Register a supervisor
#[utoipa::path(
    post,
    path = "/supervisors",
    tag = "supervisors",
    request_body = CreateSupervisor,
    responses(
        (status = 201, description = "Supervisor created", body = Supervisor),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Identifier or email already registered")
    )
)]
pub async fn create_supervisor(
    State(state): State<AppState>,
    Json(data): Json<CreateSupervisor>,
) -> AppResult<(StatusCode, Json<Supervisor>)> {
    let supervisor = state.services.supervisors.create_supervisor(data).await?;
    Ok((StatusCode::CREATED, Json(supervisor)))
}

/// Update a supervisor
#[utoipa::path(
    put,
    path = "/supervisors/{id}",
    tag = "supervisors",
    params(
        ("id" = String, Path, description = "Supervisor ID")
    ),
    request_body = UpdateSupervisor,
    responses(
        (status = 200, description = "Supervisor updated", body = Supervisor),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Supervisor not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<UpdateSupervisor>,
) -> AppResult<Json<Supervisor>> {
    let supervisor = state.services.supervisors.update_supervisor(&id, data).await?;
    Ok(Json(supervisor))
}

/// Delete a supervisor without loan history
#[utoipa::path(
    delete,
    path = "/supervisors/{id}",
    tag = "supervisors",
    params(
        ("id" = String, Path, description = "Supervisor ID")
    ),
    responses(
        (status = 204, description = "Supervisor deleted"),
        (status = 404, description = "Supervisor not found"),
        (status = 422, description = "Supervisor has loan history")
    )
)]
pub async fn delete_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.supervisors.delete_supervisor(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Audit trail of writes concerning a supervisor, newest first
#[utoipa::path(
    get,
    path = "/supervisors/{id}/audit",
    tag = "supervisors",
    params(
        ("id" = String, Path, description = "Supervisor ID"),
        AuditQuery
    ),
    responses(
        (status = 200, description = "Audit entries", body = PaginatedResponse<AuditEntry>)
    )
)]
pub async fn list_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<PaginatedResponse<AuditEntry>>> {
    let (entries, total) = state.services.supervisors.list_audit(&id, &query).await?;
    Ok(Json(PaginatedResponse::new(entries, total, query.page, query.per_page)))
}
