use crate::domain::value_objects::{UserRole, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: String, name: String, email: String, role: UserRole) -> Self {
        Self {
            id,
            name,
            email,
            role,
            department: None,
            student_id: None,
            avatar_url: None,
            status: UserStatus::Active,
            created_at: chrono::Utc::now(),
        }
    }

    /// サーバーが返したレコードをキャッシュ済みの本人情報へ反映する
    ///
    /// 省略されたオプション項目はローカルの値を残す。
    pub fn merge(&mut self, update: User) {
        self.name = update.name;
        self.email = update.email;
        self.role = update.role;
        self.status = update.status;
        if let Some(department) = update.department {
            self.department = Some(department);
        }
        if let Some(student_id) = update.student_id {
            self.student_id = Some(student_id);
        }
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
