//! State Management - JSON persistence for per-repository watermarks
//!
//! The state file records the last release reported for every repository:
//!
//! ```json
//! { "repositories": { "owner/name": { "repo": "owner/name", "version": "v1.0" } } }
//! ```
//!
//! A missing file is the same as an empty state. Writes simply overwrite the
//! file, so a failure mid-write (e.g. disk full) can lose the previous state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CheckError, Result};
use crate::release::Watermark;

/// Watermarks of every repository seen so far, keyed by `owner/name`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersistedState {
    #[serde(default)]
    pub repositories: BTreeMap<String, Watermark>,
}

impl PersistedState {
    /// Previous watermark for `repo`, or an empty one if it was never seen
    pub fn watermark(&self, repo: &str) -> Watermark {
        self.repositories
            .get(repo)
            .cloned()
            .unwrap_or_else(|| Watermark::empty(repo))
    }

    /// Replace the watermark stored for `mark.repo`
    pub fn record(&mut self, mark: Watermark) {
        self.repositories.insert(mark.repo.clone(), mark);
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

/// Loads and saves [`PersistedState`]; a store without a path does nothing
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
}

impl StateStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.filter(|p| !p.as_os_str().is_empty());
        Self { path }
    }

    /// Store that never touches the disk
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the state file
    pub fn load(&self) -> Result<PersistedState> {
        let Some(path) = &self.path else {
            debug!("No state file configured");
            return Ok(PersistedState::default());
        };

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("State file {} does not exist yet", path.display());
                return Ok(PersistedState::default());
            }
            Err(source) => {
                return Err(CheckError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        let state: PersistedState =
            serde_json::from_str(&data).map_err(|source| CheckError::CorruptState {
                path: path.clone(),
                source,
            })?;

        debug!(
            "Loaded {} repository states from {}",
            state.repositories.len(),
            path.display()
        );
        Ok(state)
    }

    /// Overwrite the state file with `state`
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let data = serde_json::to_vec(state).map_err(CheckError::Serialize)?;

        write_private(path, &data).map_err(|source| CheckError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            "Saved {} repository states to {}",
            state.repositories.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}
