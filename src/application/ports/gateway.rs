use crate::domain::entities::{Activity, Application, AttendanceRecord, Notification, User};
use crate::domain::value_objects::{ApplicationStatus, AttendanceStatus, UserRole};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[async_trait]
pub trait ActivityGateway: Send + Sync {
    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError>;
    async fn get_activity(&self, id: &str) -> Result<Activity, AppError>;
    async fn create_activity(&self, draft: &ActivityDraft) -> Result<Activity, AppError>;
    async fn update_activity(&self, id: &str, patch: &ActivityPatch)
    -> Result<Activity, AppError>;
    async fn delete_activity(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub student_id: Option<String>,
    pub activity_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub activity_id: String,
    pub activity_title: String,
    pub student_id: String,
    pub student_name: String,
}

#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, AppError>;
    async fn create_application(&self, draft: &ApplicationDraft)
    -> Result<Application, AppError>;
    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub recipient_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_role: Option<UserRole>,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, AppError>;
    async fn create_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, AppError>;
    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError>;
    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub student_id: Option<String>,
    pub activity_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    pub activity_id: String,
    pub student_id: String,
    pub student_name: String,
    pub application_id: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBatch {
    pub activity_id: String,
    pub marked_by: String,
    pub entries: Vec<AttendanceBatchEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBatchEntry {
    pub student_id: String,
    pub student_name: String,
    pub application_id: String,
    pub status: AttendanceStatus,
}

#[async_trait]
pub trait AttendanceGateway: Send + Sync {
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError>;
    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), AppError>;
    async fn mark_attendance_batch(&self, batch: &AttendanceBatch) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn create_user(&self, draft: &UserDraft) -> Result<User, AppError>;
    async fn update_user(&self, id: &str, patch: &ProfilePatch) -> Result<User, AppError>;
    async fn delete_user(&self, id: &str) -> Result<(), AppError>;
    async fn toggle_user_status(&self, id: &str) -> Result<User, AppError>;
    async fn upload_avatar(&self, id: &str, upload: &AvatarUpload) -> Result<User, AppError>;
    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;
    async fn verify_session(&self) -> Result<User, AppError>;
}
