//! Seed file persistence
//!
//! Writes are plain full overwrites, not temp-file-then-rename: a crash in
//! the middle of a write can leave a truncated file behind. Such a file is
//! reported as [`SeedError::Corrupt`] on the next load and is never read
//! as an empty baseline, which would replay every known event.

use super::error::SeedError;
use crate::schema::Snapshot;
use std::path::Path;
use tracing::debug;

/// Serialize `snapshot` as JSON and overwrite the file at `path`.
///
/// Creates the parent directory if it does not exist yet.
pub fn save_seed(path: &Path, snapshot: &Snapshot) -> Result<(), SeedError> {
    let mut content =
        serde_json::to_string(snapshot).map_err(|source| SeedError::Encode { source })?;
    content.push('\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| SeedError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Saved seed with {} stack(s) to {}", snapshot.len(), path.display());
    Ok(())
}

/// Load the snapshot stored at `path`.
///
/// Returns `Ok(None)` when the file does not exist: there is no baseline
/// yet. A file that exists but does not parse is [`SeedError::Corrupt`].
pub fn load_seed(path: &Path) -> Result<Option<Snapshot>, SeedError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let snapshot: Snapshot = serde_json::from_str(&content).map_err(|source| SeedError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded seed with {} stack(s) from {}", snapshot.len(), path.display());
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ResourceEvent, StackState};
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        [
            (
                "stack-1",
                StackState::new(
                    "CREATE_COMPLETE",
                    "web",
                    vec![ResourceEvent::from_pairs([("EventId", "e1"), ("ResourceStatus", "CREATE_COMPLETE")])],
                ),
            ),
            ("stack-2", StackState::new("UPDATE_IN_PROGRESS", "db", vec![])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_seed(&temp_dir.path().join("absent")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");

        save_seed(&path, &sample()).unwrap();
        let loaded = load_seed(&path).unwrap().unwrap();

        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");

        save_seed(&path, &sample()).unwrap();
        save_seed(&path, &Snapshot::new()).unwrap();

        assert_eq!(load_seed(&path).unwrap().unwrap(), Snapshot::new());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn test_save_creates_cache_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/cache/seed");

        save_seed(&path, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_distinct_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");
        std::fs::write(&path, "{\"stack-1\": {\"status\": \"CREATE_").unwrap();

        let err = load_seed(&path).unwrap_err();
        assert!(err.is_corrupt(), "expected corrupt error, got {err}");
    }

    #[test]
    fn test_empty_file_is_corrupt_not_empty_baseline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");
        std::fs::write(&path, "").unwrap();

        assert!(load_seed(&path).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_float_fields_survive_reload_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");

        // records as the upstream API would hand them over, parsed from text
        let events: Vec<ResourceEvent> = [
            r#"{"EventId": "e1", "Duration": 1.76441921279439612e3}"#,
            r#"{"EventId": "e2", "Duration": 0.30000000000000004}"#,
            r#"{"EventId": "e3", "Duration": 2.2250738585072014e-308}"#,
            r#"{"EventId": "e4", "Duration": 9007199254740993.5}"#,
        ]
        .iter()
        .map(|text| serde_json::from_str(text).unwrap())
        .collect();
        let original: Snapshot = [("stack-1", StackState::new("CREATE_COMPLETE", "web", events))]
            .into_iter()
            .collect();

        save_seed(&path, &original).unwrap();
        let reloaded = load_seed(&path).unwrap().unwrap();

        assert_eq!(reloaded, original);
        assert!(crate::diff(&reloaded, &original).is_empty());
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed");
        std::fs::write(&path, r#"{"stack-1": {"name": "web"}}"#).unwrap();

        assert!(load_seed(&path).unwrap_err().is_corrupt());
    }
}
