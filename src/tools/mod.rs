//! Command implementations. Each loads a snapshot, computes, and either reports
//! (dry run) or commits the result.

pub mod dedup;
pub mod diff;
pub mod map;
pub mod suggest;

pub use dedup::*;
pub use diff::*;
pub use map::*;
pub use suggest::*;
