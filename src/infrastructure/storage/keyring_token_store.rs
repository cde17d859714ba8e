use crate::application::ports::session_store::TokenStore;
use crate::shared::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "sanka";
const TOKEN_KEY: &str = "auth_token";

/// OSキーチェーンに認証トークンを保存するストア
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, TOKEN_KEY).context("Failed to create keyring entry")
    }

    fn read_token() -> Result<Option<String>> {
        let entry = Self::entry()?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to read token from keyring: {e}")),
        }
    }

    fn write_token(token: &str) -> Result<()> {
        let entry = Self::entry()?;
        entry
            .set_password(token)
            .context("Failed to save token to keyring")
    }

    fn delete_token() -> Result<()> {
        let entry = Self::entry()?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // 既に削除されている場合もOK
            Err(e) => Err(anyhow::anyhow!("Failed to delete token from keyring: {e}")),
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn load(&self) -> Result<Option<String>, AppError> {
        Self::read_token().map_err(to_storage_error)
    }

    async fn save(&self, token: &str) -> Result<(), AppError> {
        debug!("Storing auth token in keyring");
        Self::write_token(token).map_err(to_storage_error)
    }

    async fn clear(&self) -> Result<(), AppError> {
        Self::delete_token().map_err(to_storage_error)
    }
}

fn to_storage_error(e: anyhow::Error) -> AppError {
    AppError::Storage(e.to_string())
}
