//! Shared test fixtures and utilities for integration tests.
//!
//! # Test Isolation Strategy
//!
//! Every test gets a fresh temporary data directory seeded with a small Korean
//! course catalog. Nothing is shared between tests, so `--apply` runs can mutate
//! freely.
//!
//! # Available Fixtures
//!
//! - `data_dir`: a seeded [`TempDataDir`] (resources, roadmap, overrides, users)
//! - `empty_data_dir`: a [`TempDataDir`] with no files at all

use roadmap_rank::{DataDir, IdField, ResourceRecord, RoadmapStepRecord};
use rstest::fixture;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary data directory, removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempDataDir {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempDataDir {
    /// Creates a new empty data directory.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn data(&self) -> DataDir {
        DataDir::new(&self.root)
    }

    /// Writes `value` as JSON to `relative`, creating parent directories.
    ///
    /// # Panics
    /// Panics if the file cannot be written.
    pub fn write_json(&self, relative: &str, value: &Value) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let text = serde_json::to_string_pretty(value).expect("Failed to serialize fixture");
        std::fs::write(&path, text)
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", path.display(), e));
    }

    /// Reads `relative` back as JSON.
    ///
    /// # Panics
    /// Panics if the file is missing or not JSON.
    pub fn read_json(&self, relative: &str) -> Value {
        let path = self.root.join(relative);
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        serde_json::from_str(&text).expect("Fixture file is not JSON")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// Resource ids currently in resources.json.
    pub fn resource_ids(&self) -> Vec<String> {
        ids_of(&self.read_json("resources.json"))
    }

    /// The `resources` list of one roadmap step as stored.
    pub fn step_resources(&self, step_id: &str) -> Vec<String> {
        let roadmap = self.read_json("roadmap.json");
        let step = roadmap["steps"]
            .as_array()
            .and_then(|steps| steps.iter().find(|s| s["id"] == step_id))
            .unwrap_or_else(|| panic!("No step '{}' in roadmap", step_id));
        strings(&step["resources"])
    }
}

/// The `id` of every object in a JSON array.
pub fn ids_of(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|d| d["id"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// A JSON array of strings as a Vec.
pub fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

#[allow(dead_code)]
pub fn resource(
    id: &str,
    title: &str,
    description: &str,
    tags: &[&str],
    rating: f64,
) -> ResourceRecord {
    ResourceRecord {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        rating: Some(rating),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn step(id: &str, title: &str, description: &str, skills: &[&str]) -> RoadmapStepRecord {
    RoadmapStepRecord {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        skills: skills.iter().map(|s| (*s).to_string()).collect(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn users_field() -> IdField {
    IdField {
        collection: "users".into(),
        field: "savedResources".into(),
    }
}

/// A data directory with a small catalog.
///
/// `hangul-chart` and `hangul-chart-copy` share a link (the copy is newer with
/// the same rating, so `hangul-chart` is canonical).
#[fixture]
pub fn data_dir() -> TempDataDir {
    let dir = TempDataDir::new();

    dir.write_json(
        "resources.json",
        &json!([
            {
                "id": "hangul-chart",
                "title": "Hangul alphabet chart",
                "description": "Every 한글 consonant and vowel",
                "tags": ["hangul", "alphabet"],
                "rating": 4.5,
                "link": "https://example.com/hangul",
                "createdAt": "2024-01-01",
                "kind": "article"
            },
            {
                "id": "hangul-chart-copy",
                "title": "Hangul alphabet chart (mirror)",
                "description": "Every 한글 consonant and vowel",
                "tags": ["hangul"],
                "rating": 4.5,
                "link": "https://EXAMPLE.com/hangul/?ref=feed",
                "createdAt": "2024-03-01"
            },
            {
                "id": "greetings-video",
                "title": "Basic greetings",
                "description": "안녕하세요 and other greetings",
                "tags": ["greeting", "speaking"],
                "rating": 5,
                "link": "https://video.example.com/greetings"
            },
            {
                "id": "particles-guide",
                "title": "Topic and subject particles",
                "description": "은/는 versus 이/가",
                "tags": ["grammar", "particles"],
                "rating": 4,
                "link": "https://example.com/particles"
            },
            {
                "id": "drama-list",
                "title": "Dramas for listening",
                "description": "Immersion list",
                "tags": ["listening"],
                "link": "not a url"
            }
        ]),
    );

    dir.write_json(
        "roadmap.json",
        &json!({
            "title": "Korean from zero",
            "steps": [
                {
                    "id": "alphabet",
                    "title": "Learn Hangul",
                    "description": "Read the alphabet",
                    "skills": ["hangul", "alphabet"],
                    "resources": ["hangul-chart-copy"]
                },
                {
                    "id": "greetings",
                    "title": "Basic greetings",
                    "description": "",
                    "skills": ["greeting"],
                    "resources": []
                },
                {
                    "id": "grammar",
                    "title": "First grammar",
                    "description": "particles",
                    "skills": ["grammar"],
                    "resources": []
                }
            ]
        }),
    );

    dir.write_json(
        "overrides.json",
        &json!({
            "grammar": {"mode": "append", "resources": ["drama-list"]},
            "greetings": {"mode": "shuffle", "resources": ["drama-list"]}
        }),
    );

    dir.write_json(
        "collections/users.json",
        &json!([
            {
                "id": "u1",
                "name": "민지",
                "savedResources": ["hangul-chart-copy", "hangul-chart", "drama-list"]
            },
            {"id": "u2", "name": "Sam", "savedResources": ["particles-guide"]}
        ]),
    );

    dir
}

#[fixture]
pub fn empty_data_dir() -> TempDataDir {
    TempDataDir::new()
}
