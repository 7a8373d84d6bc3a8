//! Data models for Custodia

/// Store a slug enum (`as_str` + `FromStr<Err = String>`) in a TEXT column
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod audit;
pub mod dashboard;
pub mod device;
pub mod loan;
pub mod supervisor;

use once_cell::sync::Lazy;
use regex::Regex;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntity, AuditEntry};
pub use dashboard::{Alert, AlertSeverity, DashboardMetrics};
pub use device::{Device, DeviceMovement, DeviceStatus};
pub use loan::{Loan, LoanDetails};
pub use supervisor::{PermissionLevel, Supervisor, SupervisorShort};

/// Device and supervisor identifiers: 2 to 36 upper-case letters, digits
/// and dashes, not starting with a dash
pub static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9\-]{1,35}$").expect("valid identifier regex"));

/// Optional leading plus, then 8 to 15 digits
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{8,15}$").expect("valid phone regex"));

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Case-folded `LIKE` pattern matching `term` anywhere, with `%`, `_` and
/// `\` taken literally (pair with `ESCAPE '\'`)
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Highest page number whose offset still fits in an i64
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Clamp optional page/per_page query values into (page, per_page)
pub fn resolve_page(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, per_page)
}

/// Resolve optional page/per_page query values into (limit, offset)
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let (page, per_page) = resolve_page(page, per_page);
    (per_page, (page - 1) * per_page)
}
