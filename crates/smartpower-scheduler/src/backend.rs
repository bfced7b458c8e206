use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Result, SchedulerError};
use crate::state::ScheduleState;

/// Where the schedule state is loaded from and saved to.
pub trait StateBackend: Send {
    /// `Ok(None)` when nothing has been saved yet (first run).
    fn load(&self) -> Result<Option<ScheduleState>>;

    fn save(&self, state: &ScheduleState) -> Result<()>;
}

/// Flat JSON file on disk.
///
/// Saves go to a sibling temp file first and are renamed over the target so
/// a crash mid-write never leaves a truncated state file behind.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<ScheduleState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            SchedulerError::Persistence(format!("read {}: {e}", self.path.display()))
        })?;
        let state = serde_json::from_str(&raw).map_err(|e| {
            SchedulerError::Persistence(format!("parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(state))
    }

    fn save(&self, state: &ScheduleState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SchedulerError::Persistence(format!("create dir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| SchedulerError::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            SchedulerError::Persistence(format!("replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

/// In-memory backend; clones share the same slot. Content still goes through
/// JSON so it behaves like the file backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with raw file contents (e.g. a legacy or corrupt file).
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.to_string()))),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<Option<ScheduleState>> {
        match self.raw() {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SchedulerError::Persistence(e.to_string())),
        }
    }

    fn save(&self, state: &ScheduleState) -> Result<()> {
        let json =
            serde_json::to_string(state).map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        *self.raw.lock().unwrap_or_else(|p| p.into_inner()) = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state.json"));
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let backend = JsonFileBackend::new(&path);

        let mut state = ScheduleState::default();
        state.debug_mode = true;
        backend.save(&state).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(backend.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let backend = JsonFileBackend::new(&path);
        assert!(matches!(
            backend.load(),
            Err(SchedulerError::Persistence(_))
        ));
    }
}
