//! Human review of suggested mappings.
//!
//! Reviewers persist override directives per step. On disk a directive is either a
//! bare array of resource ids (full replacement) or an object
//! `{"mode": "append" | "replace", "resources": [...]}`. Directives are decoded
//! into [`OverrideDirective`] once at load time; anything else is logged and
//! ignored so the machine suggestion stands.

use crate::types::SuggestedMapping;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reviewer's correction for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideDirective {
    /// Use exactly these ids, ignoring the suggestion.
    Replace(Vec<String>),
    /// Put these ids first, followed by the suggestion, without repeats.
    Append(Vec<String>),
}

impl OverrideDirective {
    /// Ids the reviewer named explicitly.
    pub fn resources(&self) -> &[String] {
        match self {
            Self::Replace(ids) | Self::Append(ids) => ids,
        }
    }
}

/// The persisted shapes of a directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawOverride {
    List(Vec<String>),
    Tagged { mode: Mode, resources: Vec<String> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Append,
    Replace,
}

impl From<RawOverride> for OverrideDirective {
    fn from(raw: RawOverride) -> Self {
        match raw {
            RawOverride::List(ids)
            | RawOverride::Tagged {
                mode: Mode::Replace,
                resources: ids,
            } => Self::Replace(ids),
            RawOverride::Tagged {
                mode: Mode::Append,
                resources: ids,
            } => Self::Append(ids),
        }
    }
}

impl From<&OverrideDirective> for RawOverride {
    fn from(directive: &OverrideDirective) -> Self {
        match directive {
            OverrideDirective::Replace(ids) => Self::Tagged {
                mode: Mode::Replace,
                resources: ids.clone(),
            },
            OverrideDirective::Append(ids) => Self::Tagged {
                mode: Mode::Append,
                resources: ids.clone(),
            },
        }
    }
}

impl Serialize for OverrideDirective {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawOverride::from(self).serialize(serializer)
    }
}

/// Decodes one persisted directive. Returns `None` for unrecognized shapes.
pub fn decode_directive(step_id: &str, value: &serde_json::Value) -> Option<OverrideDirective> {
    match serde_json::from_value::<RawOverride>(value.clone()) {
        Ok(raw) => Some(raw.into()),
        Err(_) => {
            tracing::warn!(
                "Ignoring malformed override for step '{}': {}",
                step_id,
                value
            );
            None
        }
    }
}

/// Decodes the whole override artifact, dropping malformed entries.
pub fn decode_overrides(
    raw: &serde_json::Map<String, serde_json::Value>,
) -> BTreeMap<String, OverrideDirective> {
    raw.iter()
        .filter_map(|(step_id, value)| {
            decode_directive(step_id, value).map(|directive| (step_id.clone(), directive))
        })
        .collect()
}

/// The id array of a persisted directive, in whichever shape it was stored.
pub(crate) fn persisted_resources_mut(
    value: &mut serde_json::Value,
) -> Option<&mut serde_json::Value> {
    if value.is_array() {
        return Some(value);
    }
    value.as_object_mut()?.get_mut("resources")
}

/// Combines a suggestion with an optional override.
pub fn merge(suggested: &[String], directive: Option<&OverrideDirective>) -> Vec<String> {
    match directive {
        None => suggested.to_vec(),
        Some(OverrideDirective::Replace(ids)) => ids.clone(),
        Some(OverrideDirective::Append(ids)) => dedupe(ids.iter().chain(suggested)),
    }
}

/// Applies overrides to every step of a suggested mapping.
///
/// Overrides for steps absent from the suggestion still apply (against an empty
/// suggestion), since a reviewer may curate a step the ranker found nothing for.
pub fn apply_overrides(
    suggested: &SuggestedMapping,
    overrides: &BTreeMap<String, OverrideDirective>,
) -> SuggestedMapping {
    let mut merged: SuggestedMapping = suggested
        .iter()
        .map(|(step_id, ids)| (step_id.clone(), merge(ids, overrides.get(step_id))))
        .collect();

    for (step_id, directive) in overrides {
        merged
            .entry(step_id.clone())
            .or_insert_with(|| merge(&[], Some(directive)));
    }

    merged
}

/// Removes repeats, keeping each id at its first position.
pub fn dedupe<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen: AHashSet<&String> = AHashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
