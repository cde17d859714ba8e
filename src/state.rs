use std::sync::Arc;

use crate::application::ports::session_store::TokenCell;
use crate::application::services::{DataService, SessionService};
use crate::infrastructure::api::HttpGateway;
use crate::infrastructure::storage::{KeyringTokenStore, SessionFileStore};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;

/// アプリケーション全体の状態を管理する構造体
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session_service: Arc<SessionService>,
    pub data_service: Arc<DataService>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let token_cell = TokenCell::default();
        let gateway = Arc::new(HttpGateway::new(&config.gateway, token_cell.clone())?);

        let session_service = Arc::new(SessionService::new(
            gateway.clone(),
            gateway.clone(),
            Arc::new(SessionFileStore::new(&config.storage.data_dir)),
            Arc::new(KeyringTokenStore::new()),
            token_cell,
        ));

        let data_service = Arc::new(DataService::new(
            gateway.clone(),
            gateway.clone(),
            gateway.clone(),
            gateway,
            session_service.clone(),
        ));

        Ok(Self {
            config,
            session_service,
            data_service,
        })
    }

    /// 起動時の初期化
    ///
    /// 保存済みセッションを復元してから初回のデータ取得を行い、
    /// 通知ポーリングを開始する。
    pub async fn bootstrap(&self) {
        self.session_service.restore_session().await;
        self.data_service.refresh_data().await;
        self.data_service
            .start_notification_polling(self.config.notifications.poll_interval_secs)
            .await;
    }

    /// 終了前の停止処理
    pub async fn shutdown(&self) {
        self.data_service.stop_notification_polling().await;
    }
}
