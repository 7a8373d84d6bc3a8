//! Repository layer for database operations

pub mod audit;
pub mod dashboard;
pub mod devices;
pub mod loans;
pub mod retry;
pub mod supervisors;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

pub use retry::{with_retry, with_write_retry};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub devices: devices::DevicesRepository,
    pub supervisors: supervisors::SupervisorsRepository,
    pub loans: loans::LoansRepository,
    pub dashboard: dashboard::DashboardRepository,
    pub audit: audit::AuditRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            devices: devices::DevicesRepository::new(pool.clone()),
            supervisors: supervisors::SupervisorsRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            dashboard: dashboard::DashboardRepository::new(pool.clone()),
            audit: audit::AuditRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
