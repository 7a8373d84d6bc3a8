//! Business logic services

pub mod dashboard;
pub mod devices;
pub mod loans;
pub mod supervisors;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub devices: devices::DevicesService,
    pub supervisors: supervisors::SupervisorsService,
    pub loans: loans::LoansService,
    pub dashboard: dashboard::DashboardService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let overdue_after_days = config.loans.overdue_after_days;
        Self {
            devices: devices::DevicesService::new(repository.clone()),
            supervisors: supervisors::SupervisorsService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), overdue_after_days),
            dashboard: dashboard::DashboardService::new(
                repository.clone(),
                overdue_after_days,
                config.dashboard.recent_activity_limit,
            ),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
