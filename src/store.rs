//! Durable storage for recordings, one artifact per test.
//!
//! The file store writes pretty printed JSON so recorded fixtures can be
//! reviewed in a diff, e.g. with a recording directory of `tests/recordings`
//! the test `list_locations` is kept in `tests/recordings/list_locations.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::debug;

use crate::interaction::Recording;
use crate::Error;

pub trait InteractionStore: Send + Sync {
    fn exists(&self, test_id: &str) -> bool;

    /// Loads the recording for `test_id`. An unparseable artifact is [Error::StoreCorrupt].
    fn load(&self, test_id: &str) -> Result<Recording, Error>;

    fn save(&self, test_id: &str, recording: &Recording) -> Result<(), Error>;
}

#[derive(Clone, Debug)]
pub struct FileStore {
    recording_dir: PathBuf,
}

impl FileStore {
    pub fn new(recording_dir: impl Into<PathBuf>) -> Self {
        Self {
            recording_dir: recording_dir.into(),
        }
    }

    pub fn recording_dir(&self) -> &Path {
        &self.recording_dir
    }

    pub fn recording_file(&self, test_id: &str) -> PathBuf {
        self.recording_dir.join(format!("{}.json", sanitize_test_id(test_id)))
    }
}

impl InteractionStore for FileStore {
    fn exists(&self, test_id: &str) -> bool {
        self.recording_file(test_id).is_file()
    }

    fn load(&self, test_id: &str) -> Result<Recording, Error> {
        let path = self.recording_file(test_id);
        let content = fs::read_to_string(&path)?;
        debug!("loading recording {}", path.display());
        parse_recording(test_id, &content)
    }

    fn save(&self, test_id: &str, recording: &Recording) -> Result<(), Error> {
        fs::create_dir_all(&self.recording_dir)?;

        let path = self.recording_file(test_id);
        let content = serde_json::to_string_pretty(recording)?;
        fs::write(&path, content)?;

        debug!("saved {} interaction(s) to {}", recording.interactions.len(), path.display());
        Ok(())
    }
}

/// Keeps serialized recordings in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    recordings: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw artifact text as-is.
    pub fn insert_raw(&self, test_id: &str, content: &str) -> Result<(), Error> {
        self.recordings.write()?.insert(test_id.to_string(), content.to_string());
        Ok(())
    }

    pub fn raw(&self, test_id: &str) -> Option<String> {
        self.recordings.read().ok()?.get(test_id).cloned()
    }
}

impl InteractionStore for MemoryStore {
    fn exists(&self, test_id: &str) -> bool {
        self.recordings.read().map(|recordings| recordings.contains_key(test_id)).unwrap_or(false)
    }

    fn load(&self, test_id: &str) -> Result<Recording, Error> {
        let content = self.raw(test_id).ok_or_else(|| Error::RecordingMissing(test_id.to_string()))?;
        parse_recording(test_id, &content)
    }

    fn save(&self, test_id: &str, recording: &Recording) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(recording)?;
        self.insert_raw(test_id, &content)
    }
}

fn parse_recording(test_id: &str, content: &str) -> Result<Recording, Error> {
    serde_json::from_str(content).map_err(|e| Error::StoreCorrupt {
        test_id: test_id.to_string(),
        message: e.to_string(),
    })
}

/// Maps a test id onto a portable file name.
pub fn sanitize_test_id(test_id: &str) -> String {
    let sanitized: String = test_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "recording".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::interaction::Interaction;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_recording(test_id: &str) -> Recording {
        let interaction = Interaction {
            method: "GET".into(),
            canonical_path: "/locations".into(),
            request_body: Vec::new(),
            status_code: 200,
            response_headers: [("content-type".to_string(), "application/json".to_string())].into(),
            response_body: br#"{"locations":["West US"]}"#.to_vec(),
        };
        let variables = BTreeMap::from([("vmName".to_string(), "vm-4711".to_string())]);
        Recording::new(test_id, vec![interaction], variables)
    }

    #[test]
    fn test_sanitize_test_id() {
        assert_eq!(sanitize_test_id("jobs::list_paged"), "jobs__list_paged");
        assert_eq!(sanitize_test_id("list-locations_1"), "list-locations_1");
        assert_eq!(sanitize_test_id(""), "recording");
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested"));
        let recording = sample_recording("scheduler::list_jobs");

        assert!(!store.exists("scheduler::list_jobs"));
        store.save("scheduler::list_jobs", &recording).unwrap();

        assert!(store.exists("scheduler::list_jobs"));
        assert!(store.recording_file("scheduler::list_jobs").ends_with("scheduler__list_jobs.json"));
        assert_eq!(store.load("scheduler::list_jobs").unwrap(), recording);
    }

    #[test]
    fn test_file_store_is_human_readable() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.save("list_locations", &sample_recording("list_locations")).unwrap();

        let content = fs::read_to_string(store.recording_file("list_locations")).unwrap();

        assert!(content.contains("\n"));
        assert!(content.contains(r#""canonical_path": "/locations""#));
        assert!(content.contains("West US"));
    }

    #[test]
    fn test_file_store_corrupt_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        fs::write(store.recording_file("broken"), "{ interactions: ").unwrap();

        let result = store.load("broken");

        assert!(matches!(result, Err(Error::StoreCorrupt { test_id, .. }) if test_id == "broken"));
    }

    #[test]
    fn test_file_store_missing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(matches!(store.load("absent"), Err(Error::Io(_))));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let recording = sample_recording("list_locations");

        assert!(!store.exists("list_locations"));
        store.save("list_locations", &recording).unwrap();

        assert!(store.exists("list_locations"));
        assert_eq!(store.load("list_locations").unwrap(), recording);
        assert!(matches!(store.load("other"), Err(Error::RecordingMissing(_))));
    }

    #[test]
    fn test_memory_store_corrupt_artifact() {
        let store = MemoryStore::new();
        store.insert_raw("broken", "[1, 2").unwrap();
        assert!(matches!(store.load("broken"), Err(Error::StoreCorrupt { .. })));
    }
}
