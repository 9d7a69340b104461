//! Session-info stores
//!
//! Failures are logged and swallowed: a broken cache must never take a
//! session down.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SessionInfo, SessionKey};

pub trait SessionStore: Send + Sync {
    fn load(&self, key: &SessionKey) -> Option<SessionInfo>;
    fn save(&self, key: &SessionKey, info: &SessionInfo);
    fn clear(&self, key: &SessionKey);
}

/// Never remembers anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionStore;

impl SessionStore for NoopSessionStore {
    fn load(&self, _key: &SessionKey) -> Option<SessionInfo> {
        None
    }

    fn save(&self, _key: &SessionKey, _info: &SessionInfo) {}

    fn clear(&self, _key: &SessionKey) {}
}

/// Process-lifetime store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, SessionInfo>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &SessionKey) -> Option<SessionInfo> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    fn save(&self, key: &SessionKey, info: &SessionInfo) {
        self.sessions.insert(key.clone(), info.clone());
    }

    fn clear(&self, key: &SessionKey) {
        self.sessions.remove(key);
    }
}

/// One JSON file per session, named by the key's storage id
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    directory: PathBuf,
}

impl FileSessionStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.directory.join(format!("{}.json", key.storage_id()))
    }

    fn read_info(path: &Path) -> anyhow::Result<SessionInfo> {
        let content = fs::read_to_string(path)?;
        let info: SessionInfo = serde_json::from_str(&content)?;
        Ok(info)
    }

    fn write_info(&self, path: &Path, info: &SessionInfo) -> anyhow::Result<()> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)?;
        }
        fs::write(path, serde_json::to_string_pretty(info)?)?;
        Ok(())
    }

    /// List stored sessions as (storage id, info), newest first
    pub fn list(&self) -> anyhow::Result<Vec<(String, SessionInfo)>> {
        let mut sessions = Vec::new();

        if !self.directory.exists() {
            return Ok(sessions);
        }

        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };

            match Self::read_info(&path) {
                Ok(info) => sessions.push((id, info)),
                Err(e) => {
                    tracing::debug!("Failed to load session {:?}: {}", path, e);
                }
            }
        }

        sessions.sort_by(|a, b| b.1.registered_at.cmp(&a.1.registered_at));

        Ok(sessions)
    }

    /// Delete every stored session, returning how many were removed
    pub fn clear_all(&self) -> anyhow::Result<usize> {
        let mut removed = 0;

        if !self.directory.exists() {
            return Ok(removed);
        }

        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &SessionKey) -> Option<SessionInfo> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        match Self::read_info(&path) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", path, e);
                None
            }
        }
    }

    fn save(&self, key: &SessionKey, info: &SessionInfo) {
        let path = self.path_for(key);
        if let Err(e) = self.write_info(&path, info) {
            tracing::warn!("Failed to save session info for {}: {}", key, e);
        }
    }

    fn clear(&self, key: &SessionKey) {
        let path = self.path_for(key);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to clear session info for {}: {}", key, e);
            }
        }
    }
}
