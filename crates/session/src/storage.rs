// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: save on every change, load once on startup.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::UserProfile;

/// Serialized form of the session. Nothing beyond the three session fields.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Durable backing store for the session.
pub trait SessionStorage: Send + Sync {
    /// Return the last saved session, or `None` if nothing was ever saved.
    fn load(&self) -> anyhow::Result<Option<PersistedSession>>;

    fn save(&self, session: &PersistedSession) -> anyhow::Result<()>;
}

/// JSON file storage with atomic replace.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let session: PersistedSession = serde_json::from_str(&contents)?;
        Ok(Some(session))
    }

    /// Write to a unique temp file then rename over the target.
    ///
    /// The temp name carries PID + counter so two concurrent saves never share
    /// a `.tmp` file.
    fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(session)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// In-process storage. Used when no session file is wanted, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
    saves: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a previously saved session, as after a restart.
    pub fn with_session(session: PersistedSession) -> Self {
        Self { slot: Mutex::new(Some(session)), saves: Mutex::new(0) }
    }

    /// Last saved value.
    pub fn current(&self) -> Option<PersistedSession> {
        self.slot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        *self.slot.lock() = Some(session.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Resolve the state directory for persisted session data.
///
/// Checks `CONSOLE_STATE_DIR`, then `$XDG_STATE_HOME/console`,
/// then `$HOME/.local/state/console`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONSOLE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("console");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/console");
    }
    PathBuf::from(".console")
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
