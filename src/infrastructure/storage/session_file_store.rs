use crate::application::ports::session_store::SessionSnapshotStore;
use crate::domain::entities::User;
use crate::shared::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const SNAPSHOT_FILE: &str = "session.json";

/// 本人情報スナップショットをJSONファイルとして保存するストア
pub struct SessionFileStore {
    path: PathBuf,
}

impl SessionFileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    fn read_snapshot(&self) -> Result<Option<User>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let user = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed session snapshot at {}", self.path.display()))?;
        Ok(Some(user))
    }

    fn write_snapshot(&self, user: &User) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw =
            serde_json::to_string_pretty(user).context("Failed to encode session snapshot")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn remove_snapshot(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
    }
}

#[async_trait]
impl SessionSnapshotStore for SessionFileStore {
    async fn load(&self) -> Result<Option<User>, AppError> {
        self.read_snapshot().map_err(to_storage_error)
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        debug!("Persisting session snapshot for {}", user.id);
        self.write_snapshot(user).map_err(to_storage_error)
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.remove_snapshot().map_err(to_storage_error)
    }
}

fn to_storage_error(e: anyhow::Error) -> AppError {
    AppError::Storage(e.to_string())
}
