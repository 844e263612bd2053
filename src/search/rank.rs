//! Per-step ranking and comparison of ranking runs.

use super::index::IdfTable;
use super::scoring::{RankParams, ResourceDoc, ScoreBreakdown, score_document};
use super::tokenize::tokenize;
use crate::types::{ResourceRecord, RoadmapStepRecord, SuggestedMapping};
use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum number of resources suggested for one step.
pub const MAX_SUGGESTIONS: usize = 12;

/// A suggested resource with the score that placed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResource {
    pub id: String,
    pub breakdown: ScoreBreakdown,
}

/// Suggestions for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSuggestion {
    pub step_id: String,
    pub resources: Vec<RankedResource>,
}

impl StepSuggestion {
    pub fn ids(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.id.clone()).collect()
    }
}

/// A resource pool prepared for ranking: the IDF table plus every resource
/// tokenized once.
pub struct Corpus<'a> {
    idf: IdfTable,
    docs: Vec<ResourceDoc<'a>>,
}

impl<'a> Corpus<'a> {
    pub fn new(resources: &'a [ResourceRecord]) -> Self {
        Self {
            idf: IdfTable::build(resources),
            docs: resources.iter().map(ResourceDoc::new).collect(),
        }
    }

    pub const fn idf(&self) -> &IdfTable {
        &self.idf
    }

    /// Ranks the pool for one step.
    pub fn rank_for_step(&self, step: &RoadmapStepRecord, params: &RankParams) -> StepSuggestion {
        rank_docs(step, &self.docs, &self.idf, params)
    }

    /// Ranks every step. The result is complete or not produced at all.
    pub fn rank(&self, steps: &[RoadmapStepRecord], params: &RankParams) -> Vec<StepSuggestion> {
        steps
            .iter()
            .map(|step| self.rank_for_step(step, params))
            .collect()
    }
}

/// Ranks every step of a roadmap against the pool.
pub fn rank(
    resources: &[ResourceRecord],
    steps: &[RoadmapStepRecord],
    params: &RankParams,
) -> Vec<StepSuggestion> {
    let start = std::time::Instant::now();
    let suggestions = Corpus::new(resources).rank(steps, params);
    tracing::info!(
        "Ranked {} resources for {} steps in {:?}",
        resources.len(),
        steps.len(),
        start.elapsed()
    );
    suggestions
}

/// Ranks one step against the pool using a prebuilt IDF table.
pub fn rank_for_step(
    step: &RoadmapStepRecord,
    resources: &[ResourceRecord],
    idf: &IdfTable,
    params: &RankParams,
) -> Vec<String> {
    let docs: Vec<ResourceDoc<'_>> = resources.iter().map(ResourceDoc::new).collect();
    rank_docs(step, &docs, idf, params).ids()
}

/// Scores every document against the step and keeps the best positive ones.
///
/// Only strictly positive scores survive. Ties keep pool order (the sort is
/// stable), so the same snapshot always ranks the same way.
fn rank_docs(
    step: &RoadmapStepRecord,
    docs: &[ResourceDoc<'_>],
    idf: &IdfTable,
    params: &RankParams,
) -> StepSuggestion {
    let step_tokens = tokenize(&step.text());

    let mut ranked: Vec<RankedResource> = docs
        .iter()
        .map(|doc| RankedResource {
            id: doc.resource.id.clone(),
            breakdown: score_document(&step_tokens, doc, idf, params),
        })
        .filter(|r| r.breakdown.score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.breakdown.score.total_cmp(&a.breakdown.score));
    ranked.truncate(MAX_SUGGESTIONS);

    tracing::debug!(
        "Step '{}': {} terms, {} suggestions",
        step.id,
        step_tokens.len(),
        ranked.len()
    );

    StepSuggestion {
        step_id: step.id.clone(),
        resources: ranked,
    }
}

/// Flattens suggestions into the persisted step id → ids mapping.
pub fn to_mapping(suggestions: &[StepSuggestion]) -> SuggestedMapping {
    suggestions
        .iter()
        .map(|s| (s.step_id.clone(), s.ids()))
        .collect()
}

/// How one step's resource list differs between two mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepDiff {
    /// Ids only in the second mapping, in its order.
    pub added: Vec<String>,
    /// Ids only in the first mapping, in its order.
    pub removed: Vec<String>,
    /// The ids both mappings share appear in a different relative order.
    pub reordered: bool,
}

impl StepDiff {
    pub const fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.reordered
    }
}

/// Compares two mappings step by step. Steps with identical lists are omitted;
/// a step missing from one side counts as an empty list.
pub fn diff_mappings(a: &SuggestedMapping, b: &SuggestedMapping) -> BTreeMap<String, StepDiff> {
    let empty = Vec::new();
    let step_ids: AHashSet<&String> = a.keys().chain(b.keys()).collect();

    step_ids
        .into_iter()
        .filter_map(|step_id| {
            let before = a.get(step_id).unwrap_or(&empty);
            let after = b.get(step_id).unwrap_or(&empty);
            let diff = diff_lists(before, after);
            (!diff.is_empty()).then(|| (step_id.clone(), diff))
        })
        .collect()
}

fn diff_lists(before: &[String], after: &[String]) -> StepDiff {
    let before_set: AHashSet<&String> = before.iter().collect();
    let after_set: AHashSet<&String> = after.iter().collect();

    let added = after
        .iter()
        .filter(|id| !before_set.contains(id))
        .cloned()
        .collect();
    let removed = before
        .iter()
        .filter(|id| !after_set.contains(id))
        .cloned()
        .collect();

    let shared_before = before.iter().filter(|id| after_set.contains(id));
    let shared_after = after.iter().filter(|id| before_set.contains(id));
    let reordered = !shared_before.eq(shared_after);

    StepDiff {
        added,
        removed,
        reordered,
    }
}
