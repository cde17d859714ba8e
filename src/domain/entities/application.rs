use crate::domain::value_objects::ApplicationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 活動への参加申込
///
/// activity_title と student_name は表示用の非正規化コピー。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub activity_id: String,
    pub activity_title: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl Application {
    pub fn is_approved(&self) -> bool {
        self.status == ApplicationStatus::Approved
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }
}
