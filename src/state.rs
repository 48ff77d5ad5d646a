//! Persisted inventory snapshots
//!
//! The snapshot returned by an apply is what the next update pass needs:
//! it carries the remote ids. Snapshots are stored as pretty JSON, one file
//! per inventory, under `~/.local/state/aap-inventory/` by default.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::InventoryState;

/// JSON file holding one inventory snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default directory for state files
    pub fn state_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::State("could not determine home directory".to_string()))?;
        Ok(home.join(".local").join("state").join("aap-inventory"))
    }

    /// Store for a named inventory in the default directory
    pub fn for_inventory(name: &str) -> Result<Self> {
        let file: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Ok(Self::new(Self::state_dir()?.join(format!("{file}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` if nothing was persisted yet
    pub fn load(&self) -> Result<Option<InventoryState>> {
        if !self.path.exists() {
            log::debug!("State file {} does not exist", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::State(format!("failed to read {}: {e}", self.path.display())))?;
        let state = serde_json::from_str(&content)
            .map_err(|e| Error::State(format!("failed to parse {}: {e}", self.path.display())))?;

        log::debug!("Loaded state from {}", self.path.display());
        Ok(Some(state))
    }

    /// Persist a snapshot, creating parent directories as needed
    pub fn save(&self, state: &InventoryState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::State(format!("failed to create state directory {}: {e}", dir.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| Error::State(format!("failed to serialize state: {e}")))?;
        fs::write(&self.path, content)
            .map_err(|e| Error::State(format!("failed to write {}: {e}", self.path.display())))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Remove the snapshot, e.g. after the inventory was deleted
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::State(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
