use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub poll_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://localhost:4000".to_string(),
                timeout_secs: 30,
            },
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            notifications: NotificationConfig {
                poll_interval_secs: 15,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        // ゲートウェイ設定の環境変数反映
        if let Ok(v) = std::env::var("SANKA_GATEWAY_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.gateway.base_url = trimmed.trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("SANKA_GATEWAY_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.gateway.timeout_secs = value.max(1);
            }
        }

        if let Ok(v) = std::env::var("SANKA_DATA_DIR") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.storage.data_dir = trimmed.to_string();
            }
        }

        if let Ok(v) = std::env::var("SANKA_NOTIFY_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.notifications.poll_interval_secs = value.max(1);
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.gateway.base_url.is_empty() {
            return Err("Gateway base_url must not be empty".to_string());
        }
        if self.gateway.timeout_secs == 0 {
            return Err("Gateway timeout_secs must be greater than 0".to_string());
        }
        if self.notifications.poll_interval_secs == 0 {
            return Err("Notification poll_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

// OS標準のデータディレクトリ配下に置く(取得不可ならカレント直下)
fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("sanka").to_string_lossy().into_owned())
        .unwrap_or_else(|| "./data/sanka".to_string())
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
