use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use ultra_core::{load_state, AppState, Migration};

/// `$ULTRA_HOME`, else `~/.ultra`.
pub fn ultra_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ULTRA_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ultra"))
}

pub fn ensure_ultra_home() -> Result<PathBuf> {
    let dir = ultra_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// The state blob kept on this machine (`state.json`).
#[derive(Debug, Clone)]
pub struct LocalState {
    path: PathBuf,
}

impl LocalState {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join("state.json"),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::in_dir(&ensure_ultra_home()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse, migrate and validate; `None` when no file exists yet.
    pub fn load(&self) -> Result<Option<Migration>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))?;
        let migration = load_state(value).with_context(|| format!("load {}", self.path.display()))?;
        Ok(Some(migration))
    }

    pub fn load_or_starter(&self) -> Result<AppState> {
        Ok(self.load()?.map(|m| m.state).unwrap_or_else(AppState::starter))
    }

    /// Always writes the current schema version.
    pub fn save(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string_pretty(&state.to_persisted()?)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}
