use crate::application::ports::gateway::{
    AuthGateway, AvatarUpload, ProfilePatch, UserDraft, UserGateway,
};
use crate::application::ports::session_store::{SessionSnapshotStore, TokenCell, TokenStore};
use crate::domain::entities::User;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub is_authenticated: bool,
    pub hydrated: bool,
    pub current_user: Option<User>,
}

#[derive(Default)]
struct SessionState {
    current_user: Option<User>,
    hydrated: bool,
    users: Vec<User>,
}

pub struct SessionService {
    auth_gateway: Arc<dyn AuthGateway>,
    user_gateway: Arc<dyn UserGateway>,
    snapshot_store: Arc<dyn SessionSnapshotStore>,
    token_store: Arc<dyn TokenStore>,
    token_cell: TokenCell,
    state: Arc<RwLock<SessionState>>,
}


impl SessionService {
    pub fn new(
        auth_gateway: Arc<dyn AuthGateway>,
        user_gateway: Arc<dyn UserGateway>,
        snapshot_store: Arc<dyn SessionSnapshotStore>,
        token_store: Arc<dyn TokenStore>,
        token_cell: TokenCell,
    ) -> Self {
        Self {
            auth_gateway,
            user_gateway,
            snapshot_store,
            token_store,
            token_cell,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    /// 保存済みセッションからの復元
    ///
    /// 失敗しても匿名状態へ落とすだけで、完了後は必ず hydrated になる。
    pub async fn restore_session(&self) {
        let snapshot = match self.snapshot_store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to read session snapshot: {}", e);
                None
            }
        };
        let token = match self.token_store.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to read stored token: {}", e);
                None
            }
        };

        let restored = match token {
            Some(token) => {
                self.token_cell.set(token).await;
                match self.auth_gateway.verify_session().await {
                    Ok(user) => {
                        if let Err(e) = self.snapshot_store.save(&user).await {
                            warn!("Failed to persist verified identity: {}", e);
                        }
                        Some(user)
                    }
                    Err(AppError::Unauthenticated(reason)) | Err(AppError::Forbidden(reason)) => {
                        // 拒否された保存セッションは破棄する
                        debug!("Stored session rejected: {}", reason);
                        self.clear_persisted().await;
                        self.token_cell.clear().await;
                        None
                    }
                    Err(e) => {
                        // 到達不能の間は直近スナップショットを楽観的に使う
                        warn!("Session verification unavailable: {}", e);
                        snapshot
                    }
                }
            }
            None => snapshot,
        };

        let mut state = self.state.write().await;
        state.current_user = restored;
        state.hydrated = true;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let session = self.auth_gateway.login(email, password).await?;
        self.token_store.save(&session.token).await?;
        self.snapshot_store.save(&session.user).await?;
        self.token_cell.set(session.token).await;

        let mut state = self.state.write().await;
        state.current_user = Some(session.user.clone());
        drop(state);
        Ok(session.user)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        {
            let mut state = self.state.write().await;
            state.current_user = None;
            state.users.clear();
        }
        self.token_cell.clear().await;
        self.snapshot_store.clear().await?;
        self.token_store.clear().await?;
        Ok(())
    }

    /// プロフィール更新
    ///
    /// アバターは項目更新が成功した後にのみ送信する。アップロードが
    /// 失敗しても反映済みの項目は巻き戻さない。
    pub async fn update_profile(
        &self,
        patch: &ProfilePatch,
        avatar: Option<&AvatarUpload>,
    ) -> Result<User, AppError> {
        let current = self.require_identity().await?;

        let updated = self.user_gateway.update_user(&current.id, patch).await?;
        let mut merged = self.apply_identity_update(updated).await;

        if let Some(upload) = avatar {
            let with_avatar = self.user_gateway.upload_avatar(&merged.id, upload).await?;
            merged = self.apply_identity_update(with_avatar).await;
        }
        Ok(merged)
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        self.require_identity().await?;
        self.user_gateway
            .change_password(old_password, new_password)
            .await
    }

    pub async fn create_coordinator(&self, draft: &UserDraft) -> Result<User, AppError> {
        let created = self.user_gateway.create_user(draft).await?;
        self.refresh_users().await?;
        Ok(created)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.user_gateway.delete_user(id).await?;
        self.refresh_users().await
    }

    pub async fn toggle_user_status(&self, id: &str) -> Result<User, AppError> {
        let updated = self.user_gateway.toggle_user_status(id).await?;
        self.refresh_users().await?;
        Ok(updated)
    }

    /// ユーザー一覧の再取得
    ///
    /// トークンが無い間は取得せず成功扱いにする。
    pub async fn refresh_users(&self) -> Result<(), AppError> {
        if !self.token_cell.is_present().await {
            debug!("Skipping user directory refresh without auth token");
            return Ok(());
        }
        let users = self.user_gateway.list_users().await?;
        self.state.write().await.users = users;
        Ok(())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.current_user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.current_user.is_some()
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.read().await.hydrated
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.read().await.users.clone()
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.token_cell.get().await
    }

    pub fn token_cell(&self) -> &TokenCell {
        &self.token_cell
    }

    pub async fn session_status(&self) -> SessionStatus {
        let state = self.state.read().await;
        SessionStatus {
            is_authenticated: state.current_user.is_some(),
            hydrated: state.hydrated,
            current_user: state.current_user.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn seed_identity(&self, user: User) {
        let mut state = self.state.write().await;
        state.current_user = Some(user);
        state.hydrated = true;
    }

    async fn require_identity(&self) -> Result<User, AppError> {
        self.current_user()
            .await
            .ok_or_else(|| AppError::Unauthenticated("No active session".to_string()))
    }

    async fn apply_identity_update(&self, update: User) -> User {
        let merged = {
            let mut state = self.state.write().await;
            match state.current_user.as_mut() {
                Some(user) => {
                    user.merge(update);
                    user.clone()
                }
                None => {
                    state.current_user = Some(update.clone());
                    update
                }
            }
        };
        if let Err(e) = self.snapshot_store.save(&merged).await {
            warn!("Failed to persist updated identity: {}", e);
        }
        merged
    }

    async fn clear_persisted(&self) {
        if let Err(e) = self.snapshot_store.clear().await {
            warn!("Failed to clear session snapshot: {}", e);
        }
        if let Err(e) = self.token_store.clear().await {
            warn!("Failed to clear stored token: {}", e);
        }
    }
}

impl Clone for SessionService {
    fn clone(&self) -> Self {
        Self {
            auth_gateway: self.auth_gateway.clone(),
            user_gateway: self.user_gateway.clone(),
            snapshot_store: self.snapshot_store.clone(),
            token_store: self.token_store.clone(),
            token_cell: self.token_cell.clone(),
            state: self.state.clone(),
        }
    }
}
