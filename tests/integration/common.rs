//! Shared fixtures for database-backed tests

use custodia_server::{
    config::AppConfig,
    models::device::{CreateDevice, Device},
    models::supervisor::{CreateSupervisor, Supervisor},
    repository::Repository,
    services::Services,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn services() -> Services {
    Services::new(Repository::new(pool().await), &AppConfig::default())
}

/// Identifier that will not collide with rows from earlier runs
pub fn unique_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{}-{}", prefix, suffix)
}

pub async fn create_device(services: &Services, prefix: &str) -> Device {
    services
        .devices
        .create_device(CreateDevice {
            id: unique_id(prefix),
            name: format!("Device {}", prefix),
            category: Some("laptop".to_string()),
            status: None,
            last_maintenance_date: None,
            location: Some("Store room".to_string()),
            supervisor_id: None,
        })
        .await
        .expect("Failed to create device")
}

pub async fn create_supervisor(services: &Services, prefix: &str) -> Supervisor {
    let id = unique_id(prefix);
    services
        .supervisors
        .create_supervisor(CreateSupervisor {
            email: format!("{}@example.org", id.to_lowercase()),
            id,
            name: format!("Supervisor {}", prefix),
            phone: Some("+34600111222".to_string()),
            permission_level: None,
        })
        .await
        .expect("Failed to create supervisor")
}
