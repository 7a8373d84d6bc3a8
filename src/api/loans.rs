//! Loan ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails, LoanQuery, OpenLoan},
    AppState,
};

use super::PaginatedResponse;

/// Return response with the closed loan
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// The loan, now carrying its return date
    pub loan: Loan,
}

impl From<Loan> for ReturnResponse {
    fn from(loan: Loan) -> Self {
        Self {
            status: "returned".to_string(),
            loan,
        }
    }
}

/// List loans with filters and pagination
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = PaginatedResponse<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let (loans, total) = state.services.loans.list_loans(&query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, query.page, query.per_page)))
}

/// List every open loan
#[utoipa::path(
    get,
    path = "/loans/open",
    tag = "loans",
    responses(
        (status = 200, description = "Open loans, oldest first", body = Vec<LoanDetails>)
    )
)]
pub async fn list_open_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_open_loans().await?;
    Ok(Json(loans))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(&id).await?;
    Ok(Json(loan))
}

/// Lend a device to a supervisor
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = OpenLoan,
    responses(
        (status = 201, description = "Loan opened", body = Loan),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Device or supervisor not found"),
        (status = 422, description = "Device is not available")
    )
)]
pub async fn open_loan(
    State(state): State<AppState>,
    Json(data): Json<OpenLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.loans.open_loan(data).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Close an open loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Device returned", body = ReturnResponse),
        (status = 404, description = "No open loan with this ID")
    )
)]
pub async fn close_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.close_loan(&id).await?;
    Ok(Json(loan.into()))
}

/// Return a device by its scanned identifier
#[utoipa::path(
    post,
    path = "/devices/{id}/return",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device returned", body = ReturnResponse),
        (status = 404, description = "Device has no open loan")
    )
)]
pub async fn return_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.close_loan_by_device(&device_id).await?;
    Ok(Json(loan.into()))
}
