//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for roadmap-rank operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Failures of the persistence adapter.
///
/// Every variant names the files involved so an operator can inspect or repair
/// the data directory by hand.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another run holds the data directory lock, or a killed run left it behind.
    #[error(
        "data directory is locked by another run{} (lock file {}); \
         if no run is active, remove the lock file and retry",
        holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default(),
        path.display()
    )]
    Locked {
        path: PathBuf,
        /// Process id recorded by the holder, when readable.
        holder: Option<u32>,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing a replacement to a temp file failed. Nothing was changed.
    #[error("failed to stage write for {}; no files were changed", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replacing a file failed after others had been replaced.
    #[error(
        "failed to replace {}; {} of {} files were restored{}",
        failed.display(),
        restored.len(),
        restored.len() + unrestored.len(),
        format_unrestored(unrestored)
    )]
    Commit {
        failed: PathBuf,
        /// Files already replaced and then put back.
        restored: Vec<PathBuf>,
        /// Files already replaced that could not be put back.
        unrestored: Vec<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

fn format_unrestored(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::new();
    }
    let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("; NOT restored: {}", list.join(", "))
}
