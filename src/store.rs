//! JSON snapshot storage in a data directory.
//!
//! Runs load the complete snapshot, compute, and hand back a set of whole-file
//! replacements. [`DataDir::commit`] applies that set all-or-nothing: every file is
//! staged to a temp file first, and files already replaced are restored if a
//! later replacement fails.
//!
//! Layout:
//! ```text
//! resources.json            array of resources
//! roadmap.json              { "steps": [...] }
//! overrides.json            { stepId: directive }       (optional)
//! suggestions.json          { stepId: [resourceId] }    (optional)
//! collections/<name>.json   arrays of objects with id-bearing fields
//! ```

use crate::config::IdField;
use crate::error::StoreError;
use crate::review::{OverrideDirective, decode_overrides};
use crate::types::{ResourceRecord, Roadmap, SuggestedMapping};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LOCK_FILENAME: &str = ".roadmap-rank.lock";

/// A data directory holding the ranking inputs and outputs.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

/// Everything a run needs, loaded at once.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub resources: Vec<ResourceRecord>,
    /// The resource documents as stored, for write-back without reformatting.
    pub raw_resources: Vec<serde_json::Value>,
    pub roadmap: Roadmap,
    pub overrides: BTreeMap<String, OverrideDirective>,
    /// overrides.json as stored, malformed entries included.
    pub raw_overrides: Option<serde_json::Map<String, serde_json::Value>>,
    pub suggestions: Option<SuggestedMapping>,
    /// Collection name → documents, for every collection named by an id field.
    pub collections: BTreeMap<String, Vec<serde_json::Value>>,
}

/// A whole-file replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl FileWrite {
    /// Pretty-printed JSON with a trailing newline.
    pub fn json<T: Serialize>(path: PathBuf, value: &T) -> serde_json::Result<Self> {
        let mut contents = serde_json::to_vec_pretty(value)?;
        contents.push(b'\n');
        Ok(Self { path, contents })
    }
}

/// Exclusive claim on a data directory, released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resources_path(&self) -> PathBuf {
        self.root.join("resources.json")
    }

    pub fn roadmap_path(&self) -> PathBuf {
        self.root.join("roadmap.json")
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.root.join("overrides.json")
    }

    pub fn suggestions_path(&self) -> PathBuf {
        self.root.join("suggestions.json")
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join("collections").join(format!("{collection}.json"))
    }

    /// Claims the directory for one run. Fails if another run holds it.
    pub fn lock(&self) -> Result<RunLock, StoreError> {
        let path = self.root.join(LOCK_FILENAME);
        match std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
        {
            Ok(mut file) => {
                // Best effort; the file's existence is the lock.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(RunLock { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|pid| pid.trim().parse().ok());
                Err(StoreError::Locked { path, holder })
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Loads the full snapshot. Collections referenced by `id_fields` that do not
    /// exist load as empty.
    pub async fn load(&self, id_fields: &[IdField]) -> Result<Snapshot, StoreError> {
        let start = std::time::Instant::now();

        let raw_resources: Vec<serde_json::Value> = read_json(&self.resources_path()).await?;
        let resources = raw_resources
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ResourceRecord>, _>>()
            .map_err(|source| StoreError::Parse {
                path: self.resources_path(),
                source,
            })?;
        for (record, raw) in resources.iter().zip(&raw_resources) {
            warn_on_ignored_timestamp(record, raw);
        }

        let roadmap: Roadmap = read_json(&self.roadmap_path()).await?;

        let raw_overrides = read_optional_json::<serde_json::Map<String, serde_json::Value>>(
            &self.overrides_path(),
        )
        .await?;
        let overrides = raw_overrides
            .as_ref()
            .map(decode_overrides)
            .unwrap_or_default();

        let suggestions = read_optional_json(&self.suggestions_path()).await?;

        let mut collections: BTreeMap<String, Vec<serde_json::Value>> = BTreeMap::new();
        for field in id_fields {
            if collections.contains_key(&field.collection) {
                continue;
            }
            let path = self.collection_path(&field.collection);
            let docs: Vec<serde_json::Value> = read_optional_json(&path).await?.unwrap_or_else(|| {
                tracing::warn!(
                    "Collection '{}' not found at {}, treating as empty",
                    field.collection,
                    path.display()
                );
                Vec::new()
            });
            collections.insert(field.collection.clone(), docs);
        }

        tracing::info!(
            "Loaded snapshot from {}: {} resources, {} steps, {} overrides in {:?}",
            self.root.display(),
            resources.len(),
            roadmap.steps.len(),
            overrides.len(),
            start.elapsed()
        );

        Ok(Snapshot {
            resources,
            raw_resources,
            roadmap,
            overrides,
            raw_overrides,
            suggestions,
            collections,
        })
    }

    /// Replaces every file in `writes`, or none of them.
    pub async fn commit(&self, writes: Vec<FileWrite>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        let start = std::time::Instant::now();

        // Temp files and renames are blocking; keep them off the runtime threads.
        tokio::task::spawn_blocking(move || commit_blocking(writes))
            .await
            .expect("commit task panicked")?;

        tracing::info!("Committed {} files in {:?}", count, start.elapsed());
        Ok(())
    }
}

/// Logs a `createdAt` that was present but not understood.
fn warn_on_ignored_timestamp(record: &ResourceRecord, raw: &serde_json::Value) {
    if record.created_at.is_some() {
        return;
    }
    match raw.get("createdAt") {
        None | Some(serde_json::Value::Null) => {}
        Some(value) => tracing::warn!(
            "Resource '{}' has unrecognized createdAt {}, treating as missing",
            record.id,
            value
        ),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => read_json(path).await.map(Some),
        Ok(false) => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn commit_blocking(writes: Vec<FileWrite>) -> Result<(), StoreError> {
    // Originals first, so a failed commit can put them back.
    let mut originals = Vec::with_capacity(writes.len());
    for write in &writes {
        let original = match std::fs::read(&write.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(StoreError::Read {
                    path: write.path.clone(),
                    source,
                });
            }
        };
        originals.push(original);
    }

    let mut staged = Vec::with_capacity(writes.len());
    for write in &writes {
        let temp = stage(&write.path, &write.contents).map_err(|source| StoreError::Stage {
            path: write.path.clone(),
            source,
        })?;
        staged.push(temp);
    }

    for (index, temp) in staged.into_iter().enumerate() {
        if let Err(e) = temp.persist(&writes[index].path) {
            tracing::error!(
                "Failed to replace {}: {}; rolling back",
                writes[index].path.display(),
                e.error
            );
            let (restored, unrestored) = rollback(&writes[..index], &originals[..index]);
            return Err(StoreError::Commit {
                failed: writes[index].path.clone(),
                restored,
                unrestored,
                source: e.error,
            });
        }
        tracing::debug!("Replaced {}", writes[index].path.display());
    }

    Ok(())
}

fn stage(path: &Path, contents: &[u8]) -> std::io::Result<NamedTempFile> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// Puts back the given files. Returns (restored, not restored).
fn rollback(
    written: &[FileWrite],
    originals: &[Option<Vec<u8>>],
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut restored = Vec::new();
    let mut unrestored = Vec::new();

    for (write, original) in written.iter().zip(originals) {
        let result = match original {
            Some(bytes) => stage(&write.path, bytes)
                .and_then(|temp| temp.persist(&write.path).map(drop).map_err(|e| e.error)),
            None => std::fs::remove_file(&write.path),
        };
        match result {
            Ok(()) => restored.push(write.path.clone()),
            Err(e) => {
                tracing::error!("Failed to restore {}: {}", write.path.display(), e);
                unrestored.push(write.path.clone());
            }
        }
    }

    (restored, unrestored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());

        let lock = data.lock().unwrap();
        let_assert!(Err(StoreError::Locked { holder, .. }) = data.lock());
        check!(holder == Some(std::process::id()));
        drop(lock);
        check!(data.lock().is_ok());
    }

    #[test]
    fn test_stale_lock_error_names_file_and_recovery() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        // A run killed mid-apply leaves its lock behind.
        std::fs::write(dir.path().join(LOCK_FILENAME), "4242\n").unwrap();

        let_assert!(Err(err) = data.lock());
        let message = err.to_string();
        check!(message.contains("pid 4242"));
        check!(message.contains(LOCK_FILENAME));
        check!(message.contains("remove the lock file"));

        std::fs::remove_file(dir.path().join(LOCK_FILENAME)).unwrap();
        check!(data.lock().is_ok());
    }

    #[tokio::test]
    async fn test_load_tolerates_unrecognized_created_at() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("resources.json"),
            r#"[{"id":"r1","createdAt":1704067200000},{"id":"r2","createdAt":"soon"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("roadmap.json"), r#"{"steps":[]}"#).unwrap();

        let snapshot = DataDir::new(dir.path()).load(&[]).await.unwrap();

        let first = snapshot.resources[0].created_at.map(|ts| ts.to_rfc3339());
        check!(first.as_deref() == Some("2024-01-01T00:00:00+00:00"));
        check!(snapshot.resources[1].created_at.is_none());
        check!(snapshot.raw_resources[1]["createdAt"] == "soon");
    }

    #[test]
    fn test_commit_blocking_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("nested/b.json");
        std::fs::write(&a, "old").unwrap();

        commit_blocking(vec![
            FileWrite {
                path: a.clone(),
                contents: b"new a".to_vec(),
            },
            FileWrite {
                path: b.clone(),
                contents: b"new b".to_vec(),
            },
        ])
        .unwrap();

        check!(std::fs::read_to_string(&a).unwrap() == "new a");
        check!(std::fs::read_to_string(&b).unwrap() == "new b");
    }

    #[test]
    fn test_failure_before_replacing_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        std::fs::write(&a, "old a").unwrap();
        // A path below a regular file can never be written.
        let impossible = a.join("child.json");

        let result = commit_blocking(vec![
            FileWrite {
                path: a.clone(),
                contents: b"new a".to_vec(),
            },
            FileWrite {
                path: impossible,
                contents: b"x".to_vec(),
            },
        ]);

        check!(result.is_err());
        check!(std::fs::read_to_string(&a).unwrap() == "old a");
    }

    #[test]
    fn test_rollback_restores_and_removes() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("existing.json");
        let fresh = dir.path().join("fresh.json");
        std::fs::write(&existing, "replaced").unwrap();
        std::fs::write(&fresh, "created").unwrap();

        let written = [
            FileWrite {
                path: existing.clone(),
                contents: b"replaced".to_vec(),
            },
            FileWrite {
                path: fresh.clone(),
                contents: b"created".to_vec(),
            },
        ];
        let (restored, unrestored) = rollback(&written, &[Some(b"original".to_vec()), None]);

        check!(restored == vec![existing.clone(), fresh.clone()]);
        check!(unrestored.is_empty());
        check!(std::fs::read_to_string(&existing).unwrap() == "original");
        check!(!fresh.exists());
    }

    #[tokio::test]
    async fn test_load_optional_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resources.json"), r#"[{"id":"r1","title":"한글"}]"#)
            .unwrap();
        std::fs::write(dir.path().join("roadmap.json"), r#"{"steps":[{"id":"s1"}]}"#).unwrap();

        let fields = [IdField {
            collection: "users".into(),
            field: "savedResources".into(),
        }];
        let snapshot = DataDir::new(dir.path()).load(&fields).await.unwrap();

        check!(snapshot.resources.len() == 1);
        check!(snapshot.raw_resources.len() == 1);
        check!(snapshot.roadmap.steps[0].id == "s1");
        check!(snapshot.overrides.is_empty());
        check!(snapshot.suggestions.is_none());
        check!(snapshot.collections["users"].is_empty());
    }

    #[tokio::test]
    async fn test_load_reports_parse_errors_with_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resources.json"), "{not json").unwrap();

        let result = DataDir::new(dir.path()).load(&[]).await;
        let_assert!(Err(StoreError::Parse { path, .. }) = result);
        check!(path.ends_with("resources.json"));
    }
}
