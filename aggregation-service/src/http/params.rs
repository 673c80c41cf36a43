use serde::Deserialize;
use time::Date;

use super::error::{ApiError, ApiResult};
use crate::pipeline::parse_day;

/// Raw query string of an aggregation endpoint. Every field is optional so
/// that a missing parameter surfaces as a readable 400, not an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub entity_code: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// A checked `(entity, start, end)` triple with `start <= end`. The entity
/// code is kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub entity_code: String,
    pub start: Date,
    pub end: Date,
}

impl WindowQuery {
    pub fn validate(&self) -> ApiResult<Window> {
        let entity_code = match self.entity_code.as_deref() {
            Some(code) if !code.trim().is_empty() => code.to_string(),
            _ => return Err(ApiError::BadRequest("entityCode is required".to_string())),
        };
        let start = day_param("start", self.start.as_deref())?;
        let end = day_param("end", self.end.as_deref())?;

        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start ({start}) must not be after end ({end})"
            )));
        }

        Ok(Window {
            entity_code,
            start,
            end,
        })
    }
}

fn day_param(name: &str, value: Option<&str>) -> ApiResult<Date> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))?;
    parse_day(value).map_err(|_| {
        ApiError::BadRequest(format!("{name} must be a date formatted YYYY-MM-DD, got {value:?}"))
    })
}
