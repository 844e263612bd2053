//! Resource-to-step relevance ranking.
//!
//! This module provides the TF-IDF ranking engine: tokenization, the corpus IDF
//! table, per-(step, resource) scoring, and top-K selection per roadmap step.

pub mod index;
pub mod rank;
pub mod scoring;
pub mod tokenize;

pub use index::IdfTable;
pub use rank::{
    Corpus, MAX_SUGGESTIONS, RankedResource, StepDiff, StepSuggestion, diff_mappings, rank,
    rank_for_step, to_mapping,
};
pub use scoring::{RankParams, ResourceDoc, ScoreBreakdown, score, score_document};
pub use tokenize::{TokenSet, term_counts, tokenize};
