//! Loan model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::IDENTIFIER_RE;

/// Open loans older than this are overdue unless configured otherwise
pub const DEFAULT_OVERDUE_AFTER_DAYS: i64 = 7;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: String,
    pub device_id: String,
    pub supervisor_id: String,
    pub loan_date: DateTime<Utc>,
    /// None while the loan is open
    pub return_date: Option<DateTime<Utc>>,
    /// Per-loan override of the device location
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// An open loan is overdue once it has lasted longer than `threshold_days`
pub fn is_overdue(
    loan_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> bool {
    return_date.is_none() && now - loan_date > Duration::days(threshold_days)
}

/// Internal row for joined loan queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub supervisor_id: String,
    pub supervisor_name: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl LoanRow {
    pub fn into_details(self, now: DateTime<Utc>, threshold_days: i64) -> LoanDetails {
        LoanDetails {
            is_overdue: is_overdue(self.loan_date, self.return_date, now, threshold_days),
            id: self.id,
            device_id: self.device_id,
            device_name: self.device_name,
            supervisor_id: self.supervisor_id,
            supervisor_name: self.supervisor_name,
            loan_date: self.loan_date,
            return_date: self.return_date,
            location: self.location,
            notes: self.notes,
        }
    }
}

/// Loan with device and supervisor names for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub supervisor_id: String,
    pub supervisor_name: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    /// Loan location if set, otherwise the device location
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_overdue: bool,
}

/// Open loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenLoan {
    /// Device identifier, typed or scanned from the QR label
    #[validate(regex(path = *IDENTIFIER_RE, message = "Invalid device identifier"))]
    pub device_id: String,
    #[validate(regex(path = *IDENTIFIER_RE, message = "Invalid supervisor identifier"))]
    pub supervisor_id: String,
    /// Where the device will be used, if different from its usual location
    #[validate(length(max = 255, message = "Location is too long"))]
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Which loans a listing covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Open,
    Closed,
    #[default]
    All,
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub device_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub state: Option<LoanState>,
    /// Only loans that are currently overdue
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
