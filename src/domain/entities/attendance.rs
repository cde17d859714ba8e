use crate::domain::value_objects::AttendanceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 活動ごとの出席記録
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub activity_id: String,
    pub student_id: String,
    pub student_name: String,
    pub application_id: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
    pub marked_at: DateTime<Utc>,
}
