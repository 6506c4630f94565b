//! Attribute value checks from declared field types and lengths.

use crate::config::{ColumnInfo, FieldType};
use crate::i18n::Message;
use serde_json::Value;

/// Default length for string fields declared without one (matches the VARCHAR default in migrations).
const DEFAULT_STRING_LENGTH: u32 = 255;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

pub struct AttributeValidator;

impl AttributeValidator {
    /// `None` when the value fits the column; otherwise the message to report.
    pub fn check(column: &ColumnInfo, v: &Value) -> Option<Message> {
        if v.is_null() {
            return if column.nullable { None } else { Some(Message::InvalidValue) };
        }
        let ok = match column.field_type {
            FieldType::Int => v.as_i64().and_then(|n| i32::try_from(n).ok()).is_some(),
            FieldType::Float => v.is_number(),
            FieldType::Bool => v.is_boolean(),
            FieldType::Text => v.is_string(),
            FieldType::String => {
                let Some(s) = v.as_str() else {
                    return Some(Message::InvalidValue);
                };
                let max = column.length.unwrap_or(DEFAULT_STRING_LENGTH) as usize;
                if s.chars().count() > max {
                    return Some(Message::ValueTooLong);
                }
                true
            }
            FieldType::Date => v.as_str().map(is_date).unwrap_or(false),
            FieldType::Uuid => v
                .as_str()
                .map(|s| uuid::Uuid::parse_str(s).is_ok())
                .unwrap_or(false),
        };
        if ok {
            None
        } else {
            Some(Message::InvalidValue)
        }
    }
}

pub(crate) fn is_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|f| chrono::NaiveDateTime::parse_from_str(s, f).is_ok())
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
