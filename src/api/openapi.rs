//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{dashboard, devices, health, loans, supervisors};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Custodia API",
        version = "0.3.0",
        description = "Equipment loan tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Devices
        devices::list_devices,
        devices::get_device,
        devices::create_device,
        devices::update_device,
        devices::delete_device,
        devices::start_maintenance,
        devices::finish_maintenance,
        devices::list_movements,
        // Supervisors
        supervisors::list_supervisors,
        supervisors::get_supervisor,
        supervisors::create_supervisor,
        supervisors::update_supervisor,
        supervisors::delete_supervisor,
        supervisors::list_audit,
        // Loans
        loans::list_loans,
        loans::list_open_loans,
        loans::get_loan,
        loans::open_loan,
        loans::close_loan,
        loans::return_device,
        // Dashboard
        dashboard::get_dashboard,
    ),
    components(
        schemas(
            // Devices
            crate::models::device::Device,
            crate::models::device::DeviceStatus,
            crate::models::device::CreateDevice,
            crate::models::device::UpdateDevice,
            crate::models::device::DeviceMovement,
            // Supervisors
            crate::models::supervisor::Supervisor,
            crate::models::supervisor::SupervisorShort,
            crate::models::supervisor::PermissionLevel,
            crate::models::supervisor::CreateSupervisor,
            crate::models::supervisor::UpdateSupervisor,
            // Audit
            crate::models::audit::AuditEntry,
            crate::models::audit::AuditEntity,
            crate::models::audit::AuditAction,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanState,
            crate::models::loan::OpenLoan,
            loans::ReturnResponse,
            // Dashboard
            crate::models::dashboard::DashboardMetrics,
            crate::models::dashboard::StatusCounts,
            crate::models::dashboard::CategoryCount,
            crate::models::dashboard::ActivityEntry,
            crate::models::dashboard::ActivityKind,
            crate::models::dashboard::Alert,
            crate::models::dashboard::AlertSeverity,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "devices", description = "Device registry"),
        (name = "supervisors", description = "Supervisor registry"),
        (name = "loans", description = "Loans and returns"),
        (name = "dashboard", description = "Dashboard metrics and alerts")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
