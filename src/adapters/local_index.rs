//! Local market snapshot standing in for the retrieval subsystem.
//!
//! A snapshot is a plain JSON file of markets under a directory. The query
//! path loads it and hands it to the reasoning service as context. The trade
//! pipeline clears these directories before each run so every run starts from
//! a clean index.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::Market;
use crate::error::{PolyagentError, Result};

const SNAPSHOT_FILE: &str = "markets.json";

pub struct LocalIndex {
    directory: PathBuf,
}

impl LocalIndex {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write a snapshot of the given markets, replacing any previous one.
    /// Returns the number of markets written.
    pub fn build(&self, markets: &[Market]) -> Result<u64> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(SNAPSHOT_FILE);
        let body = serde_json::to_string_pretty(markets)?;
        fs::write(&path, body)?;
        info!("Wrote {} markets to {}", markets.len(), path.display());
        Ok(markets.len() as u64)
    }

    pub fn load(&self) -> Result<Vec<Market>> {
        let path = self.directory.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Err(PolyagentError::Validation(format!(
                "no market snapshot at {}",
                path.display()
            )));
        }
        let body = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Best-effort removal of snapshot directories. Failure to clear logs a
    /// warning and nothing more; a stale snapshot must not fail a run.
    pub fn clear_all(directories: &[String]) {
        for directory in directories {
            let path = Path::new(directory);
            if !path.exists() {
                continue;
            }
            match fs::remove_dir_all(path) {
                Ok(()) => info!("Cleared {directory}"),
                Err(e) => warn!("Failed to clear {directory}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_markets() -> Vec<Market> {
        serde_json::from_value(json!([
            {"id": "1", "question": "A?"},
            {"id": "2", "question": "B?"},
        ]))
        .unwrap()
    }

    #[test]
    fn build_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::new(dir.path());

        let written = index.build(&sample_markets()).unwrap();
        assert_eq!(written, 2);

        let loaded = index.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].question.as_deref(), Some("B?"));
    }

    #[test]
    fn load_without_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::new(dir.path().join("missing"));
        assert!(index.load().is_err());
    }

    #[test]
    fn clear_all_tolerates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("local_db_events");
        fs::create_dir_all(&existing).unwrap();

        LocalIndex::clear_all(&[
            existing.to_string_lossy().into_owned(),
            dir.path().join("never_created").to_string_lossy().into_owned(),
        ]);

        assert!(!existing.exists());
    }
}
