use crate::domain::entities::User;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 本人情報スナップショットの永続化ストア
#[async_trait]
pub trait SessionSnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<User>, AppError>;
    async fn save(&self, user: &User) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// 認証トークンの永続化ストア
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, AppError>;
    async fn save(&self, token: &str) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// プロセス内で共有する現在トークンのセル
///
/// セッションサービスが書き込み、ゲートウェイアダプタが
/// リクエスト組み立て時に読み取る。
#[derive(Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: String) {
        *self.inner.write().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn is_present(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
