//! Persist a MemoryFleet as a JSON snapshot under the XDG state dir.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{lock, FleetSnapshot, MemoryFleet};

impl MemoryFleet {
    /// Default fleet snapshot path: `~/.local/state/kwd/fleet.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("kwd")?;
        Ok(xdg_dirs.get_state_home().join("kwd").join("fleet.json"))
    }

    /// Save the current state to `path` (creates parent dir if needed).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let json = {
            let state = lock(&self.inner.state);
            serde_json::to_string_pretty(&*state).context("serialize fleet snapshot")?
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("write fleet snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Load a fleet from `path`. Returns None if the file does not exist.
    pub fn load_from_path(path: &Path, tag_capacity: usize) -> Result<Option<MemoryFleet>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read fleet snapshot: {}", path.display()))
            }
        };
        let snapshot: FleetSnapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse fleet snapshot: {}", path.display()))?;
        Ok(Some(MemoryFleet::with_tag_capacity(snapshot, tag_capacity)))
    }
}
