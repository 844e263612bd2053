//! Records consumed and produced by the ranking pipeline.
//!
//! Field names follow the camelCase used by the persisted documents. Fields the
//! pipeline does not understand are kept in `extra` so a load/store cycle never
//! drops data owned by other parts of the system.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A learning resource (video, article, tool).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// User rating on a 0.0–5.0 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Externally supplied learning-value-per-time estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
    #[serde(default)]
    pub link: String,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ResourceRecord {
    /// The single text blob indexed for this resource: title, description and tags.
    pub fn text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.tags.join(" "))
    }
}

/// One stage of the learning roadmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapStepRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Resource ids in display priority order.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RoadmapStepRecord {
    /// The text a step is matched on: title, description and skills.
    pub fn text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.description,
            self.skills.join(" ")
        )
    }
}

/// The roadmap document: an ordered list of steps plus whatever else it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(default)]
    pub steps: Vec<RoadmapStepRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Step id to ordered resource ids, best first.
pub type SuggestedMapping = BTreeMap<String, Vec<String>>;

/// Lenient `createdAt` decoding. Values that are not a recognizable timestamp
/// decode as `None`; the loader reports them per resource.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(timestamp_from_value(&raw))
}

/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates (taken as midnight UTC)
/// and integer epoch milliseconds.
pub(crate) fn timestamp_from_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(raw) => parse_timestamp(raw),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
