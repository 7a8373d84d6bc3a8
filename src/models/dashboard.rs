//! Dashboard metrics and alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{device::Device, loan::LoanDetails};

/// Devices per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub available: i64,
    pub in_use: i64,
    pub maintenance: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.available + self.in_use + self.maintenance
    }
}

/// Devices per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryCount {
    /// "uncategorized" for devices without a category
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Loaned,
    Returned,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Loaned => "loaned",
            ActivityKind::Returned => "returned",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loaned" => Ok(ActivityKind::Loaned),
            "returned" => Ok(ActivityKind::Returned),
            _ => Err(format!("Invalid activity kind: {}", s)),
        }
    }
}

text_column!(ActivityKind);

/// A loan or return event in the recent activity feed
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityEntry {
    pub loan_id: String,
    pub device_id: String,
    pub device_name: String,
    pub supervisor_name: String,
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub device_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// Everything the dashboard shows, recomputed on each request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardMetrics {
    pub total_devices: i64,
    pub by_status: StatusCounts,
    pub by_category: Vec<CategoryCount>,
    pub supervisors: i64,
    pub open_loans: i64,
    pub overdue_loans: i64,
    pub recent_activity: Vec<ActivityEntry>,
    pub alerts: Vec<Alert>,
    /// Sections that could not be loaded; they are reported empty
    pub errors: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Alerts for overdue loans and devices under maintenance, most severe first
pub fn build_alerts(
    overdue: &[LoanDetails],
    in_maintenance: &[Device],
    open_loans: i64,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::with_capacity(overdue.len() + in_maintenance.len() + 1);

    for loan in overdue {
        let days = (now - loan.loan_date).num_days();
        alerts.push(Alert {
            severity: AlertSeverity::Error,
            title: "Overdue loan".to_string(),
            description: format!(
                "{} ({}) has been with {} for {} days",
                loan.device_name, loan.device_id, loan.supervisor_name, days
            ),
            device_id: Some(loan.device_id.clone()),
            at: loan.loan_date,
        });
    }

    for device in in_maintenance {
        alerts.push(Alert {
            severity: AlertSeverity::Warning,
            title: "Maintenance in progress".to_string(),
            description: format!("{} ({}) is under maintenance", device.name, device.id),
            device_id: Some(device.id.clone()),
            at: device.updated_at,
        });
    }

    if open_loans > 0 {
        alerts.push(Alert {
            severity: AlertSeverity::Info,
            title: "Active loans".to_string(),
            description: format!("{} device(s) pending return", open_loans),
            device_id: None,
            at: now,
        });
    }

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.at.cmp(&b.at)));
    alerts
}
