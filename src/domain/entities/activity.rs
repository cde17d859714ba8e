use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub enrolled: u32,
    /// 担当コーディネーターのユーザーID
    pub coordinator_id: String,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    pub fn remaining_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }
}
