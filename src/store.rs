//! JSON key-value persistence.
//!
//! One file per key under the app data directory. Read once at startup,
//! written on every state change with whole-value replacement. A missing
//! or corrupt file is never fatal — the caller falls back to its
//! documented default and the damage is logged at warn.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config;

/// Store keys for the three persisted collections.
pub const PROFILE_KEY: &str = "profile";
pub const MEDICATIONS_KEY: &str = "medications";
pub const SESSIONS_KEY: &str = "sessions";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed key-value store.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Store rooted at the standard app data directory.
    pub fn open_default() -> Self {
        Self::at(config::app_data_dir())
    }

    /// Store rooted at an explicit directory (tests, portable mode).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load a value. `None` on missing file or undecodable content.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed, using defaults");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "store entry corrupt, using defaults");
                None
            }
        }
    }

    /// Persist a value, replacing whatever was there.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    /// Remove every entry (full application reset).
    pub fn clear(&self) -> Result<(), StoreError> {
        for key in [PROFILE_KEY, MEDICATIONS_KEY, SESSIONS_KEY] {
            let path = self.path_for(key);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
