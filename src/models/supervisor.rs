//! Supervisor model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{IDENTIFIER_RE, PHONE_RE};

/// Permission levels a supervisor may hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Basic,
    #[serde(alias = "manager")]
    Advanced,
    Admin,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Basic => "basic",
            PermissionLevel::Advanced => "advanced",
            PermissionLevel::Admin => "admin",
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(PermissionLevel::Basic),
            "advanced" | "manager" => Ok(PermissionLevel::Advanced),
            "admin" => Ok(PermissionLevel::Admin),
            _ => Err(format!("Invalid permission level: {}", s)),
        }
    }
}

text_column!(PermissionLevel);

/// Full supervisor record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Supervisor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub permission_level: PermissionLevel,
    pub registration_date: DateTime<Utc>,
}

/// Supervisor row for lists, with the number of loans currently held
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SupervisorShort {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub permission_level: PermissionLevel,
    pub open_loans: i64,
}

/// Supervisor query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SupervisorQuery {
    pub permission_level: Option<PermissionLevel>,
    /// Case-insensitive search on name or email
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create supervisor request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupervisor {
    #[validate(regex(path = *IDENTIFIER_RE, message = "Identifier must be 2-36 upper-case letters, digits or dashes"))]
    pub id: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 8-15 digits, optionally prefixed by +"))]
    pub phone: Option<String>,
    pub permission_level: Option<PermissionLevel>,
}

/// Update supervisor request; `"phone": null` removes the phone number
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSupervisor {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 8-15 digits, optionally prefixed by +"))]
    pub phone: Option<Option<String>>,
    pub permission_level: Option<PermissionLevel>,
}
