//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{models::dashboard::DashboardMetrics, AppState};

/// Current metrics, alerts and recent activity
///
/// Always answers 200; sections that could not be read are empty and
/// listed in `errors`.
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard metrics", body = DashboardMetrics)
    )
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardMetrics> {
    Json(state.services.dashboard.metrics().await)
}
