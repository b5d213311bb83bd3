//! Analysis model
//!
//! The AI-generated health analysis returned by the analysis service: summary,
//! profile snapshot, a sparse metric series keyed by arbitrary metric names,
//! and recommendations.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Profile snapshot extracted from the patient's records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    #[serde(default, deserialize_with = "optional_text")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub age: Option<String>,
    #[serde(default, alias = "bloodGroup", deserialize_with = "optional_text")]
    pub blood_group: Option<String>,
    #[serde(default, deserialize_with = "optional_text_list")]
    pub allergies: Option<Vec<String>>,
}

/// One dated row of readings. Any metric name may appear; a reading may be
/// an explicit null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: String,
    #[serde(flatten, deserialize_with = "numeric_readings")]
    pub readings: BTreeMap<String, Option<f64>>,
}

impl MetricRecord {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            readings: BTreeMap::new(),
        }
    }

    /// Builder-style helper for assembling records
    pub fn with(mut self, key: impl Into<String>, value: Option<f64>) -> Self {
        self.readings.insert(key.into(), value);
        self
    }

    /// Reading for a metric. Absent and null are both `None`.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.readings.get(key).copied().flatten()
    }

    /// Whether any of the given metrics has a reading on this record
    pub fn has_any_value<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|k| self.value(k.as_ref()).is_some())
    }

    /// Calendar date of the record. Accepts `YYYY-MM-DD`, RFC 3339, and
    /// naive `YYYY-MM-DDTHH:MM:SS` timestamps.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_calendar_date(&self.date)
    }
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// The analysis payload as delivered by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default)]
    pub profile: Option<HealthProfile>,
    #[serde(default, alias = "availableMetrics", deserialize_with = "optional_text_list")]
    pub available_metrics: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub metrics: Vec<MetricRecord>,
    #[serde(default, deserialize_with = "text_list")]
    pub tips: Vec<String>,
}

impl AnalysisResult {
    /// Backend-declared metric keys, if declared and non-empty
    pub fn active_metric_keys(&self) -> Option<&[String]> {
        self.available_metrics
            .as_deref()
            .filter(|keys| !keys.is_empty())
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Profile fields are text, but the model sometimes answers `32` instead of `"32 yrs"`
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_text))
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lists of text under the same rules as single fields. A bare string is a
/// one-item list; null, blank and non-text items are dropped.
fn optional_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(None),
        Some(single) => vec![single],
    };

    Ok(Some(
        items
            .into_iter()
            .filter_map(value_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
    ))
}

fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text_list(deserializer)?.unwrap_or_default())
}

/// Numbers become readings; null and non-numeric values become "no reading"
fn numeric_readings<'de, D>(deserializer: D) -> Result<BTreeMap<String, Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, value.as_f64()))
        .collect())
}
