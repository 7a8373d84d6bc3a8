//! API handlers for Custodia REST endpoints

pub mod dashboard;
pub mod devices;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod supervisors;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{models::resolve_page, AppState};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Rows of the requested page
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Rows per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Report the page and page size the query actually used
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (page, per_page) = resolve_page(page, per_page);
        Self {
            items,
            total,
            page,
            per_page,
        }
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Devices
        .route("/devices", get(devices::list_devices).post(devices::create_device))
        .route(
            "/devices/:id",
            get(devices::get_device)
                .put(devices::update_device)
                .delete(devices::delete_device),
        )
        .route(
            "/devices/:id/maintenance",
            post(devices::start_maintenance).delete(devices::finish_maintenance),
        )
        .route("/devices/:id/movements", get(devices::list_movements))
        .route("/devices/:id/return", post(loans::return_device))
        // Supervisors
        .route(
            "/supervisors",
            get(supervisors::list_supervisors).post(supervisors::create_supervisor),
        )
        .route(
            "/supervisors/:id",
            get(supervisors::get_supervisor)
                .put(supervisors::update_supervisor)
                .delete(supervisors::delete_supervisor),
        )
        .route("/supervisors/:id/audit", get(supervisors::list_audit))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::open_loan))
        .route("/loans/open", get(loans::list_open_loans))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::close_loan))
        // Dashboard
        .route("/dashboard", get(dashboard::get_dashboard))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
