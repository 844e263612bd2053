pub mod apply;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod format;
pub mod review;
pub mod search;
pub mod store;
pub mod tools;
pub mod tracing;
pub mod types;

pub use config::{Config, IdField};
pub use dedup::{DuplicateGroup, DuplicateReport, RewriteTable, find_duplicates};
pub use review::{OverrideDirective, merge};
pub use search::{RankParams, rank, tokenize};
pub use store::DataDir;
pub use types::{ResourceRecord, Roadmap, RoadmapStepRecord, SuggestedMapping};
