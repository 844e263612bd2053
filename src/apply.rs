//! Turning ranking and dedup results into concrete changes.
//!
//! A plan is computed from a loaded [`Snapshot`] without touching storage. It can
//! be rendered as a dry-run report or turned into file writes for
//! [`DataDir::commit`](crate::store::DataDir::commit).

use crate::config::IdField;
use crate::dedup::{DuplicateReport, RewriteTable, find_duplicates};
use crate::error::Result;
use crate::review::{apply_overrides, persisted_resources_mut};
use crate::store::{DataDir, FileWrite, Snapshot};
use crate::types::{Roadmap, SuggestedMapping};
use ahash::AHashSet;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A step whose resource list changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepChange {
    pub step_id: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Writing the reviewed mapping into the roadmap.
#[derive(Debug, Clone)]
pub struct MappingPlan {
    pub changes: Vec<StepChange>,
    /// Override ids that name no resource in the pool, per step. Kept.
    pub unknown_ids: BTreeMap<String, Vec<String>>,
    /// Suggested ids that name no resource in the pool, per step. Dropped.
    pub stale_ids: BTreeMap<String, Vec<String>>,
    roadmap: Roadmap,
}

impl MappingPlan {
    /// Merges `suggested` with the snapshot's overrides and canonicalizes the result.
    ///
    /// Steps the mapping says nothing about keep their current resources. Every
    /// id is passed through the current duplicate rewrite table so steps only
    /// reference canonical resources. Suggested ids missing from the pool are
    /// dropped, since a stored suggestion can outlive the records it names.
    pub fn new(snapshot: &Snapshot, suggested: &SuggestedMapping) -> Self {
        let rewrites = find_duplicates(&snapshot.resources).rewrite_table;
        let known: AHashSet<&str> = snapshot.resources.iter().map(|r| r.id.as_str()).collect();

        let mut stale_ids = BTreeMap::new();
        let mut current = SuggestedMapping::new();
        for (step_id, ids) in suggested {
            let (kept, stale): (Vec<String>, Vec<String>) =
                ids.iter().cloned().partition(|id| known.contains(id.as_str()));
            if !stale.is_empty() {
                tracing::warn!(
                    "Suggestion for step '{}' names missing resources, dropping: {}",
                    step_id,
                    stale.join(", ")
                );
                stale_ids.insert(step_id.clone(), stale);
            }
            current.insert(step_id.clone(), kept);
        }
        let merged = apply_overrides(&current, &snapshot.overrides);

        let mut unknown_ids = BTreeMap::new();
        for (step_id, directive) in &snapshot.overrides {
            let unknown: Vec<String> = directive
                .resources()
                .iter()
                .filter(|id| !known.contains(id.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                tracing::warn!(
                    "Override for step '{}' names unknown resources: {}",
                    step_id,
                    unknown.join(", ")
                );
                unknown_ids.insert(step_id.clone(), unknown);
            }
        }

        let mut roadmap = snapshot.roadmap.clone();
        let mut changes = Vec::new();
        for step in &mut roadmap.steps {
            let Some(ids) = merged.get(&step.id) else {
                continue;
            };
            let after = rewrites.rewrite(ids);
            if after != step.resources {
                changes.push(StepChange {
                    step_id: step.id.clone(),
                    before: std::mem::replace(&mut step.resources, after.clone()),
                    after,
                });
            }
        }

        Self {
            changes,
            unknown_ids,
            stale_ids,
            roadmap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub const fn roadmap(&self) -> &Roadmap {
        &self.roadmap
    }

    pub fn writes(&self, data: &DataDir) -> Result<Vec<FileWrite>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![
            FileWrite::json(data.roadmap_path(), &self.roadmap)
                .context("Failed to serialize roadmap")?,
        ])
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        if self.changes.is_empty() {
            output.push_str("Roadmap already matches the reviewed mapping.\n");
        } else {
            let _ = writeln!(output, "Steps to update ({}):", self.changes.len());
            render_step_changes(&mut output, &self.changes);
        }
        for (step_id, ids) in &self.unknown_ids {
            let _ = writeln!(
                output,
                "warning: override for '{}' names unknown resources: {}",
                step_id,
                ids.join(", ")
            );
        }
        for (step_id, ids) in &self.stale_ids {
            let _ = writeln!(
                output,
                "warning: suggestion for '{}' names missing resources, dropped: {}",
                step_id,
                ids.join(", ")
            );
        }
        output
    }
}

/// A document field whose id list changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub collection: String,
    pub field: String,
    /// The document's `id`/`_id`, or `#<index>` when it has neither.
    pub document: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Collapsing duplicate resources into their canonical records.
#[derive(Debug, Clone)]
pub struct DedupPlan {
    pub report: DuplicateReport,
    pub step_changes: Vec<StepChange>,
    /// Stored suggestion lists that referenced superseded ids.
    pub suggestion_changes: Vec<StepChange>,
    /// Stored override directives that referenced superseded ids.
    pub override_changes: Vec<StepChange>,
    pub field_changes: Vec<FieldChange>,
    /// Non-canonical resource ids removed from the pool.
    pub removed: Vec<String>,
    roadmap: Roadmap,
    suggestions: Option<SuggestedMapping>,
    overrides: Option<serde_json::Map<String, serde_json::Value>>,
    resources: Vec<serde_json::Value>,
    collections: BTreeMap<String, Vec<serde_json::Value>>,
}

impl DedupPlan {
    /// Rewrites the roadmap, the stored suggestions and overrides, and every
    /// declared id field through the duplicate rewrite table, and drops
    /// superseded records from the pool.
    pub fn new(snapshot: &Snapshot, id_fields: &[IdField]) -> Self {
        let report = find_duplicates(&snapshot.resources);
        let table = &report.rewrite_table;

        let mut roadmap = snapshot.roadmap.clone();
        let mut step_changes = Vec::new();
        for step in &mut roadmap.steps {
            rewrite_ids(&step.id, &mut step.resources, table, &mut step_changes);
        }

        let mut suggestions = snapshot.suggestions.clone();
        let mut suggestion_changes = Vec::new();
        for (step_id, ids) in suggestions.iter_mut().flatten() {
            rewrite_ids(step_id, ids, table, &mut suggestion_changes);
        }

        // Directives are rewritten in place so each keeps its stored shape.
        let mut overrides = snapshot.raw_overrides.clone();
        let mut override_changes = Vec::new();
        for (step_id, value) in overrides.iter_mut().flatten() {
            let Some(slot) = persisted_resources_mut(value) else {
                continue;
            };
            let Some(mut ids) = string_array(slot) else {
                continue;
            };
            if rewrite_ids(step_id, &mut ids, table, &mut override_changes) {
                *slot = serde_json::Value::from(ids);
            }
        }

        let mut collections = snapshot.collections.clone();
        let mut field_changes = Vec::new();
        for id_field in id_fields {
            if let Some(docs) = collections.get_mut(&id_field.collection) {
                rewrite_field(docs, id_field, table, &mut field_changes);
            }
        }

        let mut removed = Vec::new();
        let resources = snapshot
            .raw_resources
            .iter()
            .filter(|doc| match doc.get("id").and_then(|id| id.as_str()) {
                Some(id) if table.get(id).is_some() => {
                    removed.push(id.to_owned());
                    false
                }
                _ => true,
            })
            .cloned()
            .collect();

        Self {
            report,
            step_changes,
            suggestion_changes,
            override_changes,
            field_changes,
            removed,
            roadmap,
            suggestions,
            overrides,
            resources,
            collections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.step_changes.is_empty()
            && self.suggestion_changes.is_empty()
            && self.override_changes.is_empty()
            && self.field_changes.is_empty()
    }

    /// File replacements for every file the plan changes.
    pub fn writes(&self, data: &DataDir) -> Result<Vec<FileWrite>> {
        let mut writes = Vec::new();
        if !self.removed.is_empty() {
            writes.push(
                FileWrite::json(data.resources_path(), &self.resources)
                    .context("Failed to serialize resources")?,
            );
        }
        if !self.step_changes.is_empty() {
            writes.push(
                FileWrite::json(data.roadmap_path(), &self.roadmap)
                    .context("Failed to serialize roadmap")?,
            );
        }
        if let Some(suggestions) = &self.suggestions
            && !self.suggestion_changes.is_empty()
        {
            writes.push(
                FileWrite::json(data.suggestions_path(), suggestions)
                    .context("Failed to serialize suggestions")?,
            );
        }
        if let Some(overrides) = &self.overrides
            && !self.override_changes.is_empty()
        {
            writes.push(
                FileWrite::json(data.overrides_path(), overrides)
                    .context("Failed to serialize overrides")?,
            );
        }
        let touched: AHashSet<&str> = self
            .field_changes
            .iter()
            .map(|c| c.collection.as_str())
            .collect();
        for (name, docs) in &self.collections {
            if touched.contains(name.as_str()) {
                writes.push(
                    FileWrite::json(data.collection_path(name), docs)
                        .with_context(|| format!("Failed to serialize collection '{}'", name))?,
                );
            }
        }
        Ok(writes)
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        if self.report.groups.is_empty() {
            output.push_str("No duplicate resources found.\n");
            return output;
        }

        let _ = writeln!(output, "Duplicate groups ({}):", self.report.groups.len());
        for group in &self.report.groups {
            let _ = writeln!(output, "  • {}", group.key);
            let _ = writeln!(output, "      keep    {}", group.canonical);
            for member in group.members.iter().filter(|m| **m != group.canonical) {
                let _ = writeln!(output, "      replace {}", member);
            }
        }

        for (heading, changes) in [
            ("Roadmap steps", &self.step_changes),
            ("Stored suggestions", &self.suggestion_changes),
            ("Stored overrides", &self.override_changes),
        ] {
            if !changes.is_empty() {
                let _ = writeln!(output, "\n{} to rewrite ({}):", heading, changes.len());
                render_step_changes(&mut output, changes);
            }
        }

        if !self.field_changes.is_empty() {
            let _ = writeln!(
                output,
                "\nCollection fields to rewrite ({}):",
                self.field_changes.len()
            );
            for change in &self.field_changes {
                let _ = writeln!(
                    output,
                    "  • {}/{}.{}: [{}] → [{}]",
                    change.collection,
                    change.document,
                    change.field,
                    change.before.join(", "),
                    change.after.join(", ")
                );
            }
        }

        let _ = writeln!(
            output,
            "\nResources to remove ({}): {}",
            self.removed.len(),
            self.removed.join(", ")
        );
        output
    }
}

/// Rewrites one id list in place, recording the change. Returns whether it changed.
fn rewrite_ids(
    step_id: &str,
    ids: &mut Vec<String>,
    table: &RewriteTable,
    changes: &mut Vec<StepChange>,
) -> bool {
    let after = table.rewrite(ids);
    if after == *ids {
        return false;
    }
    changes.push(StepChange {
        step_id: step_id.to_owned(),
        before: std::mem::replace(ids, after.clone()),
        after,
    });
    true
}

/// Rewrites `field` on every document that holds an array of string ids there.
fn rewrite_field(
    docs: &mut [serde_json::Value],
    id_field: &IdField,
    table: &RewriteTable,
    changes: &mut Vec<FieldChange>,
) {
    for (index, doc) in docs.iter_mut().enumerate() {
        let document = document_label(doc, index);
        let Some(value) = doc.get_mut(&id_field.field) else {
            continue;
        };
        let Some(before) = string_array(value) else {
            tracing::warn!(
                "Skipping {}/{}.{}: not an array of ids",
                id_field.collection,
                document,
                id_field.field
            );
            continue;
        };

        let after = table.rewrite(&before);
        if after != before {
            *value = serde_json::Value::from(after.clone());
            changes.push(FieldChange {
                collection: id_field.collection.clone(),
                field: id_field.field.clone(),
                document,
                before,
                after,
            });
        }
    }
}

fn string_array(value: &serde_json::Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect()
}

fn document_label(doc: &serde_json::Value, index: usize) -> String {
    ["id", "_id"]
        .iter()
        .find_map(|key| doc.get(*key).and_then(|v| v.as_str()))
        .map_or_else(|| format!("#{index}"), str::to_owned)
}

fn render_step_changes(output: &mut String, changes: &[StepChange]) {
    for change in changes {
        let _ = writeln!(output, "  • {}", change.step_id);
        let _ = writeln!(output, "      before [{}]", change.before.join(", "));
        let _ = writeln!(output, "      after  [{}]", change.after.join(", "));
    }
}
