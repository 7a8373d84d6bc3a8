//! Audit trail of writes to the registry and the loan ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Kind of record an audit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
    Device,
    Supervisor,
    Loan,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Device => "device",
            AuditEntity::Supervisor => "supervisor",
            AuditEntity::Loan => "loan",
        }
    }
}

impl std::str::FromStr for AuditEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(AuditEntity::Device),
            "supervisor" => Ok(AuditEntity::Supervisor),
            "loan" => Ok(AuditEntity::Loan),
            _ => Err(format!("Invalid audit entity: {}", s)),
        }
    }
}

text_column!(AuditEntity);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Lend,
    Return,
    MaintenanceStart,
    MaintenanceFinish,
}

impl AuditAction {
    pub const ALL: [AuditAction; 7] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::Lend,
        AuditAction::Return,
        AuditAction::MaintenanceStart,
        AuditAction::MaintenanceFinish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Lend => "lend",
            AuditAction::Return => "return",
            AuditAction::MaintenanceStart => "maintenance_start",
            AuditAction::MaintenanceFinish => "maintenance_finish",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Invalid audit action: {}", s))
    }
}

text_column!(AuditAction);

/// One audited write, with the record before and after it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditEntry {
    pub id: String,
    pub entity: AuditEntity,
    pub record_id: String,
    pub action: AuditAction,
    /// Supervisor the write concerns: the loan holder, the supervisor
    /// record itself, or the supervisor responsible for the device
    pub supervisor_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[schema(value_type = Option<Object>)]
    pub previous_data: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub new_data: Option<serde_json::Value>,
}

/// Audit log query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
