use crate::domain::value_objects::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_role: Option<UserRole>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_for(&self, user_id: &str) -> bool {
        self.recipient_id == user_id
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}
