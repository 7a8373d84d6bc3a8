//! Dashboard aggregator: read-only metrics recomputed on every request

use chrono::Utc;

use super::loans::LoansService;
use crate::{
    error::AppResult,
    models::dashboard::{build_alerts, DashboardMetrics},
    models::device::DeviceStatus,
    repository::{with_retry, Repository},
};

/// Unwrap a section result, falling back to its empty value and recording the failure
fn degrade<T: Default>(section: &str, result: AppResult<T>, errors: &mut Vec<String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(section, error = %e, "Dashboard section unavailable");
            errors.push(format!("{}: {}", section, e));
            T::default()
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
    loans: LoansService,
    recent_activity_limit: i64,
}

impl DashboardService {
    pub fn new(repository: Repository, overdue_after_days: i64, recent_activity_limit: i64) -> Self {
        Self {
            loans: LoansService::new(repository.clone(), overdue_after_days),
            repository,
            recent_activity_limit,
        }
    }

    pub async fn metrics(&self) -> DashboardMetrics {
        let dashboard = &self.repository.dashboard;

        let (by_status, by_category, supervisors, open_loans, overdue, in_maintenance, recent) = tokio::join!(
            with_retry("dashboard_status", || dashboard.status_counts()),
            with_retry("dashboard_categories", || dashboard.category_counts()),
            with_retry("dashboard_supervisors", || self.repository.supervisors.count()),
            self.loans.count_active(),
            self.loans.list_overdue_loans(),
            with_retry("dashboard_maintenance", || {
                self.repository.devices.list_by_status(DeviceStatus::Maintenance)
            }),
            with_retry("dashboard_activity", || {
                dashboard.recent_activity(self.recent_activity_limit)
            }),
        );

        let mut errors = Vec::new();
        let by_status = degrade("by_status", by_status, &mut errors);
        let by_category = degrade("by_category", by_category, &mut errors);
        let supervisors = degrade("supervisors", supervisors, &mut errors);
        let open_loans = degrade("open_loans", open_loans, &mut errors);
        let overdue = degrade("overdue_loans", overdue, &mut errors);
        let in_maintenance = degrade("maintenance", in_maintenance, &mut errors);
        let recent_activity = degrade("recent_activity", recent, &mut errors);

        let now = Utc::now();
        let alerts = build_alerts(&overdue, &in_maintenance, open_loans, now);

        DashboardMetrics {
            total_devices: by_status.total(),
            by_status,
            by_category,
            supervisors,
            open_loans,
            overdue_loans: overdue.len() as i64,
            recent_activity,
            alerts,
            errors,
            generated_at: now,
        }
    }
}
