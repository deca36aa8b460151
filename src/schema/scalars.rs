//! Custom scalar registration
//!
//! Scalars declared in SDL are registered with the engine as-is, except for the
//! well-known `Date` and `DateTime` names which get ISO 8601 validators.

use async_graphql::dynamic::Scalar;
use async_graphql::Value;
use chrono::{DateTime as ChronoDateTime, NaiveDate};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Whether the engine already provides this scalar
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// Build the engine scalar for a `scalar <name>` declaration
pub fn custom_scalar(name: &str, description: Option<&str>) -> Scalar {
    let scalar = match name {
        "Date" => date_scalar(),
        "DateTime" => datetime_scalar(),
        _ => Scalar::new(name),
    };

    match description {
        Some(desc) => scalar.description(desc),
        None => scalar,
    }
}

fn is_valid_date(value: &Value) -> bool {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s.as_str(), "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

fn is_valid_datetime(value: &Value) -> bool {
    match value {
        Value::String(s) => ChronoDateTime::parse_from_rfc3339(s.as_str()).is_ok(),
        _ => false,
    }
}

/// ISO 8601 date (YYYY-MM-DD)
fn date_scalar() -> Scalar {
    Scalar::new("Date")
        .description("ISO 8601 date format (YYYY-MM-DD)")
        .validator(is_valid_date)
}

/// ISO 8601 datetime with timezone
fn datetime_scalar() -> Scalar {
    Scalar::new("DateTime")
        .description("ISO 8601 datetime format with timezone")
        .validator(is_valid_datetime)
}
