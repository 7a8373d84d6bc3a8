//! Device model and lifecycle status

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::IDENTIFIER_RE;
use crate::error::{AppError, AppResult};

/// Lifecycle status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Available,
    InUse,
    Maintenance,
}

/// Events that move a device between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Lend,
    Return,
    StartMaintenance,
    FinishMaintenance,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 3] = [
        DeviceStatus::Available,
        DeviceStatus::InUse,
        DeviceStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Available => "available",
            DeviceStatus::InUse => "in_use",
            DeviceStatus::Maintenance => "maintenance",
        }
    }

    /// Status after `event`, or `InvalidState` if the event is not allowed
    /// from the current status.
    pub fn apply(self, event: DeviceEvent) -> AppResult<DeviceStatus> {
        match (self, event) {
            (DeviceStatus::Available, DeviceEvent::Lend) => Ok(DeviceStatus::InUse),
            (DeviceStatus::InUse, DeviceEvent::Return) => Ok(DeviceStatus::Available),
            (DeviceStatus::Available, DeviceEvent::StartMaintenance) => Ok(DeviceStatus::Maintenance),
            (DeviceStatus::Maintenance, DeviceEvent::FinishMaintenance) => Ok(DeviceStatus::Available),
            (status, event) => Err(AppError::InvalidState(format!(
                "Cannot {} a device that is {}",
                event.verb(),
                status
            ))),
        }
    }
}

impl DeviceEvent {
    fn verb(&self) -> &'static str {
        match self {
            DeviceEvent::Lend => "lend",
            DeviceEvent::Return => "return",
            DeviceEvent::StartMaintenance => "start maintenance on",
            DeviceEvent::FinishMaintenance => "finish maintenance on",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(DeviceStatus::Available),
            "in_use" => Ok(DeviceStatus::InUse),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            _ => Err(format!("Invalid device status: {}", s)),
        }
    }
}

text_column!(DeviceStatus);

/// Device record, with the assigned supervisor's name joined in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub status: DeviceStatus,
    pub last_maintenance_date: Option<NaiveDate>,
    /// Where the device normally lives
    pub location: Option<String>,
    pub supervisor_id: Option<String>,
    pub supervisor_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create device request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDevice {
    /// Unique identifier, usually the code printed on the device's QR label
    #[validate(regex(path = *IDENTIFIER_RE, message = "Identifier must be 2-36 upper-case letters, digits or dashes"))]
    pub id: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub category: Option<String>,
    /// Initial status: available (default) or maintenance
    pub status: Option<DeviceStatus>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub location: Option<String>,
    #[validate(regex(path = *IDENTIFIER_RE, message = "Invalid supervisor identifier"))]
    pub supervisor_id: Option<String>,
}

/// Update device request. Status is driven by loans and maintenance only.
///
/// Nullable columns take three states: absent leaves the value alone,
/// `null` clears it, anything else replaces it.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateDevice {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub last_maintenance_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(regex(path = *IDENTIFIER_RE, message = "Invalid supervisor identifier"))]
    pub supervisor_id: Option<Option<String>>,
    /// Supervisor recorded on the movement entry when the location changes
    #[validate(regex(path = *IDENTIFIER_RE, message = "Invalid supervisor identifier"))]
    pub moved_by: Option<String>,
}

/// Device query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    pub status: Option<DeviceStatus>,
    pub category: Option<String>,
    pub supervisor_id: Option<String>,
    /// Case-insensitive search on name or identifier
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One entry of a device's location history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DeviceMovement {
    pub id: String,
    pub device_id: String,
    pub previous_location: Option<String>,
    pub new_location: String,
    pub moved_at: DateTime<Utc>,
    pub supervisor_id: Option<String>,
}
