//! Wire format and validation of submission batches and previous-entry lookups.

use crate::error::ProgressError;
use crate::{Category, StaffRef, SubmissionBatch, SubmittedEntry};
use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One entry of a submission batch as it travels over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInput {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_i32"
    )]
    pub staff_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// The body of `POST /api/progress` as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub year: i32,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_id: Option<i32>,
    pub data: Vec<EntryInput>,
}

/// A validated previous-entry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousQuery {
    pub staff_id: i32,
    pub category: Category,
    pub current_date: NaiveDate,
}

/// Accepts an integer given either as a JSON number or a numeric string, as browser
/// form values arrive as strings. Null and empty strings become `None`.
fn deserialize_lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    lenient_i32(value.as_ref()).map_err(de::Error::custom)
}

fn lenient_i32(value: Option<&Value>) -> Result<Option<i32>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("{n} is not a valid integer id")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("{s:?} is not a valid integer")),
        Some(other) => Err(format!("expected an integer, found {other}")),
    }
}

/// A field counts as missing when it is absent, null, false, zero or an empty string.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ProgressError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ProgressError::validation(format!("{value:?} is not a YYYY-MM-DD date")))
}

/// Validate a submission body.
///
/// # Errors
/// Returns a validation error if `year` or `date` is missing, `data` is not an array,
/// or an entry has no staff reference or an unknown category. A missing category is
/// not rejected here; the store refuses it and the whole batch is rolled back.
pub fn parse_submission(body: &Value) -> Result<SubmissionBatch, ProgressError> {
    let year = body.get("year");
    let date = body.get("date");
    let data = body.get("data");
    if is_missing(year) || is_missing(date) || !data.is_some_and(Value::is_array) {
        return Err(ProgressError::validation(
            "missing required fields: year, date and a data array are required",
        ));
    }

    let year = lenient_i32(year)
        .map_err(|e| ProgressError::validation(format!("year: {e}")))?
        .ok_or_else(|| ProgressError::validation("year is required"))?;
    let date = match date {
        Some(Value::String(s)) => parse_date(s)?,
        _ => return Err(ProgressError::validation("date must be a YYYY-MM-DD string")),
    };
    let collector_id = lenient_i32(body.get("collectorId"))
        .map_err(|e| ProgressError::validation(format!("collectorId: {e}")))?;

    let inputs: Vec<EntryInput> = serde_json::from_value(data.cloned().unwrap_or_default())
        .map_err(|e| ProgressError::validation(format!("invalid entry in data: {e}")))?;
    let entries = inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| validate_entry(index, input))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SubmissionBatch {
        year,
        date,
        collector_id,
        entries,
    })
}

fn validate_entry(index: usize, input: EntryInput) -> Result<SubmittedEntry, ProgressError> {
    let staff = match (input.staff_id, input.staff_name) {
        (Some(id), _) => StaffRef::Id(id),
        (None, Some(name)) if !name.trim().is_empty() => StaffRef::Name(name),
        _ => {
            return Err(ProgressError::validation(format!(
                "entry {index} needs a staffId or a staffName"
            )));
        }
    };
    let category = match input.category.as_deref() {
        None | Some("") => None,
        Some(label) => Some(label.parse::<Category>()?),
    };
    Ok(SubmittedEntry {
        staff,
        text: input.text,
        category,
    })
}

/// Validate the query string of the previous-entry lookup. Empty values count as missing.
///
/// # Errors
/// Returns a validation error if any parameter is missing or cannot be parsed.
pub fn parse_previous_query(
    staff_id: Option<&str>,
    category: Option<&str>,
    current_date: Option<&str>,
) -> Result<PreviousQuery, ProgressError> {
    fn present(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let (Some(staff_id), Some(category), Some(current_date)) =
        (present(staff_id), present(category), present(current_date))
    else {
        return Err(ProgressError::validation(
            "missing required parameters: staffId, category and currentDate",
        ));
    };

    let staff_id = staff_id
        .parse::<i32>()
        .map_err(|_| ProgressError::validation(format!("staffId {staff_id:?} is not an integer")))?;
    Ok(PreviousQuery {
        staff_id,
        category: category.parse()?,
        current_date: parse_date(current_date)?,
    })
}
