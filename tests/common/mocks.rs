use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use sanka_client::application::ports::gateway::{
    ActivityDraft, ActivityFilter, ActivityGateway, ActivityPatch, ApplicationDraft,
    ApplicationFilter, ApplicationGateway, AttendanceBatch, AttendanceFilter, AttendanceGateway,
    AttendanceSubmission, AuthGateway, AuthSession, AvatarUpload, NotificationDraft,
    NotificationFilter, NotificationGateway, ProfilePatch, UserDraft, UserGateway,
};
use sanka_client::application::ports::session_store::{
    SessionSnapshotStore, TokenCell, TokenStore,
};
use sanka_client::application::services::{DataService, SessionService};
use sanka_client::domain::entities::{
    Activity, Application, AttendanceRecord, Notification, User,
};
use sanka_client::domain::value_objects::ApplicationStatus;
use sanka_client::shared::error::AppError;

/// verify_session の応答を切り替えるモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    Accept,
    Reject,
    Offline,
}

/// 全ゲートウェイを束ねたインメモリ実装
///
/// 呼び出し履歴と失敗注入を備え、バックエンドの副作用
/// (申込による定員集計、承認通知) も再現する。
pub struct InMemoryGateway {
    activities: RwLock<Vec<Activity>>,
    applications: RwLock<Vec<Application>>,
    notifications: RwLock<Vec<Notification>>,
    attendance: RwLock<Vec<AttendanceRecord>>,
    users: RwLock<Vec<User>>,
    accounts: RwLock<Vec<(String, String, String)>>,
    session_user: RwLock<Option<User>>,
    verify_mode: RwLock<VerifyMode>,
    calls: RwLock<Vec<&'static str>>,
    fail_ops: RwLock<HashSet<&'static str>>,
    delay: RwLock<Option<Duration>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            activities: RwLock::new(Vec::new()),
            applications: RwLock::new(Vec::new()),
            notifications: RwLock::new(Vec::new()),
            attendance: RwLock::new(Vec::new()),
            users: RwLock::new(Vec::new()),
            accounts: RwLock::new(Vec::new()),
            session_user: RwLock::new(None),
            verify_mode: RwLock::new(VerifyMode::Accept),
            calls: RwLock::new(Vec::new()),
            fail_ops: RwLock::new(HashSet::new()),
            delay: RwLock::new(None),
        }
    }

    pub async fn seed_activities(&self, activities: Vec<Activity>) {
        *self.activities.write().await = activities;
    }

    pub async fn seed_applications(&self, applications: Vec<Application>) {
        *self.applications.write().await = applications;
    }

    pub async fn seed_notifications(&self, notifications: Vec<Notification>) {
        *self.notifications.write().await = notifications;
    }

    pub async fn seed_attendance(&self, records: Vec<AttendanceRecord>) {
        *self.attendance.write().await = records;
    }

    /// ログイン可能なアカウントとして登録する
    pub async fn register_account(&self, user: User, password: &str) {
        self.accounts
            .write()
            .await
            .push((user.email.clone(), password.to_string(), user.id.clone()));
        self.users.write().await.push(user);
    }

    pub async fn set_session_user(&self, user: Option<User>) {
        *self.session_user.write().await = user;
    }

    pub async fn set_verify_mode(&self, mode: VerifyMode) {
        *self.verify_mode.write().await = mode;
    }

    pub async fn fail_op(&self, op: &'static str) {
        self.fail_ops.write().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.fail_ops.write().await.clear();
    }

    /// 全オペレーション実行前に挟む待ち時間
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, op: &str) -> usize {
        self.calls.read().await.iter().filter(|c| **c == op).count()
    }

    pub async fn stored_activities(&self) -> Vec<Activity> {
        self.activities.read().await.clone()
    }

    pub async fn stored_applications(&self) -> Vec<Application> {
        self.applications.read().await.clone()
    }

    pub async fn stored_notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn stored_attendance(&self) -> Vec<AttendanceRecord> {
        self.attendance.read().await.clone()
    }

    pub async fn stored_users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    async fn gate(&self, op: &'static str) -> Result<(), AppError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.write().await.push(op);
        if self.fail_ops.read().await.contains(op) {
            return Err(AppError::Gateway(format!("injected failure for {op}")));
        }
        Ok(())
    }

    fn mint_id(prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

#[async_trait]
impl ActivityGateway for InMemoryGateway {
    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError> {
        self.gate("list_activities").await?;
        let activities = self.activities.read().await;
        Ok(activities
            .iter()
            .filter(|a| {
                filter
                    .category
                    .as_ref()
                    .map_or(true, |category| &a.category == category)
            })
            .filter(|a| {
                filter
                    .status
                    .as_ref()
                    .map_or(true, |status| &a.status == status)
            })
            .cloned()
            .collect())
    }

    async fn get_activity(&self, id: &str) -> Result<Activity, AppError> {
        self.gate("get_activity").await?;
        self.activities
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Activity {id} not found")))
    }

    async fn create_activity(&self, draft: &ActivityDraft) -> Result<Activity, AppError> {
        self.gate("create_activity").await?;
        let activity = Activity {
            id: Self::mint_id("act"),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            date: draft.date.clone(),
            time: draft.time.clone(),
            location: draft.location.clone(),
            capacity: draft.capacity,
            enrolled: 0,
            coordinator_id: draft
                .coordinator_id
                .clone()
                .unwrap_or_else(|| "server-assigned".to_string()),
            status: "upcoming".to_string(),
            created_at: chrono::Utc::now(),
        };
        self.activities.write().await.push(activity.clone());
        Ok(activity)
    }

    async fn update_activity(
        &self,
        id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, AppError> {
        self.gate("update_activity").await?;
        let mut activities = self.activities.write().await;
        let activity = activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {id} not found")))?;
        if let Some(title) = &patch.title {
            activity.title = title.clone();
        }
        if let Some(description) = &patch.description {
            activity.description = description.clone();
        }
        if let Some(category) = &patch.category {
            activity.category = category.clone();
        }
        if let Some(date) = &patch.date {
            activity.date = date.clone();
        }
        if let Some(time) = &patch.time {
            activity.time = time.clone();
        }
        if let Some(location) = &patch.location {
            activity.location = location.clone();
        }
        if let Some(capacity) = patch.capacity {
            activity.capacity = capacity;
        }
        if let Some(status) = &patch.status {
            activity.status = status.clone();
        }
        Ok(activity.clone())
    }

    async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        self.gate("delete_activity").await?;
        self.activities.write().await.retain(|a| a.id != id);
        Ok(())
    }
}

#[async_trait]
impl ApplicationGateway for InMemoryGateway {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, AppError> {
        self.gate("list_applications").await?;
        let applications = self.applications.read().await;
        Ok(applications
            .iter()
            .filter(|a| {
                filter
                    .student_id
                    .as_ref()
                    .map_or(true, |student_id| &a.student_id == student_id)
            })
            .filter(|a| {
                filter
                    .activity_id
                    .as_ref()
                    .map_or(true, |activity_id| &a.activity_id == activity_id)
            })
            .cloned()
            .collect())
    }

    async fn create_application(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<Application, AppError> {
        self.gate("create_application").await?;
        let application = Application {
            id: Self::mint_id("app"),
            activity_id: draft.activity_id.clone(),
            activity_title: draft.activity_title.clone(),
            student_id: draft.student_id.clone(),
            student_name: draft.student_name.clone(),
            status: ApplicationStatus::Pending,
            notes: None,
            applied_at: chrono::Utc::now(),
        };
        self.applications.write().await.push(application.clone());
        Ok(application)
    }

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<(), AppError> {
        self.gate("update_application_status").await?;
        let mut applications = self.applications.write().await;
        let application = applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
        application.status = status;
        if let Some(notes) = notes {
            application.notes = Some(notes.to_string());
        }
        if status == ApplicationStatus::Approved {
            // 定員は承認時に消費される
            let mut activities = self.activities.write().await;
            if let Some(activity) = activities
                .iter_mut()
                .find(|a| a.id == application.activity_id)
            {
                activity.enrolled += 1;
            }
            // 承認時は申込者へ通知が発行される
            self.notifications.write().await.push(Notification {
                id: Self::mint_id("notif"),
                recipient_id: application.student_id.clone(),
                title: "Application approved".to_string(),
                message: format!("Your application for {} was approved", application.activity_title),
                kind: "application".to_string(),
                read: false,
                sender_role: None,
                created_at: chrono::Utc::now(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for InMemoryGateway {
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, AppError> {
        self.gate("list_notifications").await?;
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| {
                filter
                    .recipient_id
                    .as_ref()
                    .map_or(true, |recipient_id| &n.recipient_id == recipient_id)
            })
            .cloned()
            .collect())
    }

    async fn create_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, AppError> {
        self.gate("create_notification").await?;
        let notification = Notification {
            id: Self::mint_id("notif"),
            recipient_id: draft.recipient_id.clone(),
            title: draft.title.clone(),
            message: draft.message.clone(),
            kind: draft.kind.clone(),
            read: false,
            sender_role: draft.sender_role,
            created_at: chrono::Utc::now(),
        };
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        self.gate("mark_notification_read").await?;
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<(), AppError> {
        self.gate("mark_all_notifications_read").await?;
        let mut notifications = self.notifications.write().await;
        for notification in notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id)
        {
            notification.read = true;
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceGateway for InMemoryGateway {
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.gate("list_attendance").await?;
        let attendance = self.attendance.read().await;
        Ok(attendance
            .iter()
            .filter(|r| {
                filter
                    .student_id
                    .as_ref()
                    .map_or(true, |student_id| &r.student_id == student_id)
            })
            .filter(|r| {
                filter
                    .activity_id
                    .as_ref()
                    .map_or(true, |activity_id| &r.activity_id == activity_id)
            })
            .cloned()
            .collect())
    }

    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), AppError> {
        self.gate("mark_attendance").await?;
        let mut attendance = self.attendance.write().await;
        // 同じ活動・学生の記録は上書き
        attendance.retain(|r| {
            !(r.activity_id == submission.activity_id && r.student_id == submission.student_id)
        });
        attendance.push(AttendanceRecord {
            id: Self::mint_id("att"),
            activity_id: submission.activity_id.clone(),
            student_id: submission.student_id.clone(),
            student_name: submission.student_name.clone(),
            application_id: submission.application_id.clone(),
            status: submission.status,
            marked_by: submission.marked_by.clone(),
            marked_at: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn mark_attendance_batch(&self, batch: &AttendanceBatch) -> Result<(), AppError> {
        self.gate("mark_attendance_batch").await?;
        let mut attendance = self.attendance.write().await;
        for entry in &batch.entries {
            attendance.retain(|r| {
                !(r.activity_id == batch.activity_id && r.student_id == entry.student_id)
            });
            attendance.push(AttendanceRecord {
                id: Self::mint_id("att"),
                activity_id: batch.activity_id.clone(),
                student_id: entry.student_id.clone(),
                student_name: entry.student_name.clone(),
                application_id: entry.application_id.clone(),
                status: entry.status,
                marked_by: batch.marked_by.clone(),
                marked_at: chrono::Utc::now(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserGateway for InMemoryGateway {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.gate("list_users").await?;
        Ok(self.users.read().await.clone())
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<User, AppError> {
        self.gate("create_user").await?;
        let mut user = User::new(
            Self::mint_id("u"),
            draft.name.clone(),
            draft.email.clone(),
            draft.role,
        );
        user.department = draft.department.clone();
        self.accounts.write().await.push((
            user.email.clone(),
            draft.password.clone(),
            user.id.clone(),
        ));
        self.users.write().await.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: &ProfilePatch) -> Result<User, AppError> {
        self.gate("update_user").await?;
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        if let Some(department) = &patch.department {
            user.department = Some(department.clone());
        }
        if let Some(student_id) = &patch.student_id {
            user.student_id = Some(student_id.clone());
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.gate("delete_user").await?;
        self.users.write().await.retain(|u| u.id != id);
        Ok(())
    }

    async fn toggle_user_status(&self, id: &str) -> Result<User, AppError> {
        self.gate("toggle_user_status").await?;
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
        user.status = user.status.toggled();
        Ok(user.clone())
    }

    async fn upload_avatar(&self, id: &str, upload: &AvatarUpload) -> Result<User, AppError> {
        self.gate("upload_avatar").await?;
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
        user.avatar_url = Some(format!("/uploads/{}", upload.file_name));
        Ok(user.clone())
    }

    async fn change_password(
        &self,
        _old_password: &str,
        _new_password: &str,
    ) -> Result<(), AppError> {
        self.gate("change_password").await?;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for InMemoryGateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.gate("login").await?;
        let user_id = {
            let accounts = self.accounts.read().await;
            accounts
                .iter()
                .find(|(account_email, account_password, _)| {
                    account_email == email && account_password == password
                })
                .map(|(_, _, user_id)| user_id.clone())
        };
        let user_id =
            user_id.ok_or_else(|| AppError::Unauthenticated("Invalid credentials".to_string()))?;
        let user = self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated("Unknown account".to_string()))?;
        *self.session_user.write().await = Some(user.clone());
        Ok(AuthSession {
            token: format!("tok-{}", user.id),
            user,
        })
    }

    async fn verify_session(&self) -> Result<User, AppError> {
        self.gate("verify_session").await?;
        match *self.verify_mode.read().await {
            VerifyMode::Accept => self
                .session_user
                .read()
                .await
                .clone()
                .ok_or_else(|| AppError::Unauthenticated("No stored session".to_string())),
            VerifyMode::Reject => {
                Err(AppError::Unauthenticated("session expired".to_string()))
            }
            VerifyMode::Offline => Err(AppError::Gateway("connection refused".to_string())),
        }
    }
}

/// スナップショットのインメモリ版ストア
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshot: RwLock<Option<User>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(user: User) -> Self {
        Self {
            snapshot: RwLock::new(Some(user)),
        }
    }

    pub async fn stored(&self) -> Option<User> {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl SessionSnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<User>, AppError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        *self.snapshot.write().await = Some(user.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.snapshot.write().await = None;
        Ok(())
    }
}

/// トークンのインメモリ版ストア
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }

    pub async fn stored(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, AppError> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), AppError> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// ゲートウェイとストアからサービス一式を組み立てる
pub fn build_services(
    gateway: Arc<InMemoryGateway>,
    snapshots: Arc<MemorySnapshotStore>,
    tokens: Arc<MemoryTokenStore>,
) -> (Arc<SessionService>, DataService) {
    let session = Arc::new(SessionService::new(
        gateway.clone(),
        gateway.clone(),
        snapshots,
        tokens,
        TokenCell::new(),
    ));
    let data = DataService::new(
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
        gateway,
        session.clone(),
    );
    (session, data)
}
