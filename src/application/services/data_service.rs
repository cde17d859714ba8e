use crate::application::ports::gateway::{
    ActivityDraft, ActivityFilter, ActivityGateway, ActivityPatch, ApplicationDraft,
    ApplicationFilter, ApplicationGateway, AttendanceBatch, AttendanceBatchEntry, AttendanceFilter,
    AttendanceGateway, AttendanceSubmission, NotificationDraft, NotificationFilter,
    NotificationGateway,
};
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{Activity, Application, AttendanceRecord, Notification, User};
use crate::domain::value_objects::{ApplicationStatus, AttendanceStatus, UserRole};
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct DomainCollections {
    activities: Vec<Activity>,
    applications: Vec<Application>,
    notifications: Vec<Notification>,
    attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub capacity: u32,
    /// 管理者のみ指定可能な担当コーディネーター
    pub coordinator_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub activity_id: String,
    pub activity_title: String,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
}

/// ドメインコレクションのローカルストア
///
/// 活動・申込・通知・出席の 4 コレクションを保持し、
/// ゲートウェイ越しの取得と更新を束ねる。
pub struct DataService {
    activity_gateway: Arc<dyn ActivityGateway>,
    application_gateway: Arc<dyn ApplicationGateway>,
    notification_gateway: Arc<dyn NotificationGateway>,
    attendance_gateway: Arc<dyn AttendanceGateway>,
    session: Arc<SessionService>,
    collections: Arc<RwLock<DomainCollections>>,
    loading: Arc<AtomicBool>,
    refresh_generation: Arc<AtomicU64>,
    poller: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DataService {
    pub fn new(
        activity_gateway: Arc<dyn ActivityGateway>,
        application_gateway: Arc<dyn ApplicationGateway>,
        notification_gateway: Arc<dyn NotificationGateway>,
        attendance_gateway: Arc<dyn AttendanceGateway>,
        session: Arc<SessionService>,
    ) -> Self {
        Self {
            activity_gateway,
            application_gateway,
            notification_gateway,
            attendance_gateway,
            session,
            collections: Arc::new(RwLock::new(DomainCollections::default())),
            loading: Arc::new(AtomicBool::new(false)),
            refresh_generation: Arc::new(AtomicU64::new(0)),
            poller: Arc::new(Mutex::new(None)),
        }
    }

    /// 全コレクションの再取得
    ///
    /// 失敗してもこの呼び出し自体はエラーにせず、コレクションを
    /// 空へ戻してログに残す。実行中に新しい更新が始まった場合、
    /// 古い結果は反映しない。
    pub async fn refresh_data(&self) {
        let generation = self.next_generation();

        let Some(user) = self.session.current_user().await else {
            // 本人情報が無い間はローカル状態を空に保つ
            if self.is_current(generation) {
                *self.collections.write().await = DomainCollections::default();
                self.loading.store(false, Ordering::SeqCst);
            }
            return;
        };

        self.loading.store(true, Ordering::SeqCst);
        let outcome = self.load_collections(&user, generation).await;

        if !self.is_current(generation) {
            debug!("Discarding superseded refresh (generation {})", generation);
            return;
        }
        if let Err(e) = outcome {
            error!("Data refresh failed: {}", e);
            *self.collections.write().await = DomainCollections::default();
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    async fn load_collections(&self, user: &User, generation: u64) -> Result<(), AppError> {
        // 活動一覧は他コレクションの前提になるため先に単独で取得する
        let activities = self
            .activity_gateway
            .list_activities(&ActivityFilter::default())
            .await?;
        if !self.is_current(generation) {
            return Ok(());
        }
        self.collections.write().await.activities = activities;

        if self.session.auth_token().await.is_none() {
            debug!("Skipping authenticated collections without token");
            if self.is_current(generation) {
                let mut collections = self.collections.write().await;
                collections.applications = Vec::new();
                collections.notifications = Vec::new();
                collections.attendance = Vec::new();
            }
            return Ok(());
        }

        // 学生は自分の申込と出席のみ、管理者は全通知を対象にする
        let application_filter = if user.role.is_student() {
            ApplicationFilter {
                student_id: Some(user.id.clone()),
                ..Default::default()
            }
        } else {
            ApplicationFilter::default()
        };
        let notification_filter = self.notification_filter_for(user);
        let attendance_future = async {
            if user.role.is_student() {
                self.attendance_gateway
                    .list_attendance(&AttendanceFilter {
                        student_id: Some(user.id.clone()),
                        ..Default::default()
                    })
                    .await
            } else {
                Ok(Vec::new())
            }
        };

        let (applications, notifications, attendance) = tokio::join!(
            self.application_gateway
                .list_applications(&application_filter),
            self.notification_gateway
                .list_notifications(&notification_filter),
            attendance_future,
        );
        let applications = applications?;
        let notifications = notifications?;
        let attendance = attendance?;

        if !self.is_current(generation) {
            return Ok(());
        }
        let mut collections = self.collections.write().await;
        collections.applications = applications;
        collections.notifications = notifications;
        collections.attendance = attendance;
        Ok(())
    }

    pub async fn create_activity(&self, input: NewActivity) -> Result<Activity, AppError> {
        let user = self.require_identity().await?;
        if !user.role.can_manage_activities() {
            return Err(AppError::Forbidden(
                "Only admins and coordinators can create activities".to_string(),
            ));
        }

        // コーディネーター自身の作成では担当者指定をサーバーに委ねる
        let coordinator_id = match user.role {
            UserRole::Admin => input.coordinator_id,
            _ => None,
        };
        let draft = ActivityDraft {
            title: input.title,
            description: input.description,
            category: input.category,
            date: input.date,
            time: input.time,
            location: input.location,
            capacity: input.capacity,
            coordinator_id,
        };

        let activity = self.activity_gateway.create_activity(&draft).await?;
        self.collections
            .write()
            .await
            .activities
            .push(activity.clone());
        Ok(activity)
    }

    pub async fn update_activity(
        &self,
        id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, AppError> {
        let updated = self.activity_gateway.update_activity(id, patch).await?;
        let mut collections = self.collections.write().await;
        if let Some(slot) = collections.activities.iter_mut().find(|a| a.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        self.activity_gateway.delete_activity(id).await?;
        let mut collections = self.collections.write().await;
        collections.activities.retain(|a| a.id != id);
        // 削除済み活動に紐づく申込もローカルから取り除く
        collections.applications.retain(|a| a.activity_id != id);
        Ok(())
    }

    /// 参加申込の作成
    ///
    /// 申込者の項目は呼び出し側入力ではなく本人情報から埋める。
    /// 作成後は定員集計を最新化するため対象の活動だけ取り直す。
    pub async fn create_application(&self, input: NewApplication) -> Result<Application, AppError> {
        let user = self.require_identity().await?;
        {
            let collections = self.collections.read().await;
            if !collections
                .activities
                .iter()
                .any(|a| a.id == input.activity_id)
            {
                return Err(AppError::NotFound(format!(
                    "Activity {} is not loaded",
                    input.activity_id
                )));
            }
        }

        let draft = ApplicationDraft {
            activity_id: input.activity_id.clone(),
            activity_title: input.activity_title,
            student_id: user.id.clone(),
            student_name: user.name.clone(),
        };
        let application = self.application_gateway.create_application(&draft).await?;
        self.collections
            .write()
            .await
            .applications
            .push(application.clone());

        let fresh = self.activity_gateway.get_activity(&input.activity_id).await?;
        let mut collections = self.collections.write().await;
        if let Some(slot) = collections.activities.iter_mut().find(|a| a.id == fresh.id) {
            *slot = fresh;
        }
        drop(collections);
        Ok(application)
    }

    /// 申込の更新(ステータス変更のみ対応)
    ///
    /// 承認は定員・通知など広範囲へ波及するため、成功後に全体を取り直す。
    pub async fn update_application(
        &self,
        id: &str,
        update: &ApplicationUpdate,
    ) -> Result<(), AppError> {
        let Some(status) = update.status else {
            return Err(AppError::UnsupportedOperation(
                "Only status changes are supported for applications".to_string(),
            ));
        };
        self.application_gateway
            .update_application_status(id, status, update.notes.as_deref())
            .await?;
        self.refresh_data().await;
        Ok(())
    }

    pub async fn mark_attendance(
        &self,
        activity_id: &str,
        student_id: &str,
        status: AttendanceStatus,
        marked_by: &str,
    ) -> Result<(), AppError> {
        let application = self
            .approved_application(activity_id, student_id)
            .await?;

        let submission = AttendanceSubmission {
            activity_id: activity_id.to_string(),
            student_id: student_id.to_string(),
            student_name: application.student_name.clone(),
            application_id: application.id,
            status,
            marked_by: marked_by.to_string(),
        };
        self.attendance_gateway.mark_attendance(&submission).await?;
        self.load_activity_attendance(activity_id).await?;
        Ok(())
    }

    /// 出席の一括登録
    ///
    /// 全員分の承認済み申込を検証してからゲートウェイへ送る。
    /// 一人でも対象外ならゲートウェイ呼び出しは行わない。
    pub async fn save_attendance_batch(
        &self,
        activity_id: &str,
        status_by_student: &HashMap<String, AttendanceStatus>,
        marked_by: &str,
    ) -> Result<(), AppError> {
        self.require_identity().await?;

        let mut entries = Vec::with_capacity(status_by_student.len());
        for (student_id, status) in status_by_student {
            let application = self.approved_application(activity_id, student_id).await?;
            entries.push(AttendanceBatchEntry {
                student_id: student_id.clone(),
                student_name: application.student_name,
                application_id: application.id,
                status: *status,
            });
        }
        if entries.is_empty() {
            return Ok(());
        }

        let batch = AttendanceBatch {
            activity_id: activity_id.to_string(),
            marked_by: marked_by.to_string(),
            entries,
        };
        self.attendance_gateway.mark_attendance_batch(&batch).await?;
        self.load_activity_attendance(activity_id).await?;
        Ok(())
    }

    /// 指定活動の出席記録を取り直し、その活動の分だけ差し替える
    pub async fn load_activity_attendance(
        &self,
        activity_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let fresh = self
            .attendance_gateway
            .list_attendance(&AttendanceFilter {
                activity_id: Some(activity_id.to_string()),
                ..Default::default()
            })
            .await?;
        let mut collections = self.collections.write().await;
        collections.attendance.retain(|r| r.activity_id != activity_id);
        collections.attendance.extend(fresh.iter().cloned());
        Ok(fresh)
    }

    pub async fn create_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, AppError> {
        let notification = self.notification_gateway.create_notification(draft).await?;
        self.collections
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    /// 既読化は本人宛ての通知に限る
    pub async fn mark_notification_as_read(&self, id: &str) -> Result<(), AppError> {
        let Some(user) = self.session.current_user().await else {
            return Ok(());
        };
        let addressed = {
            let collections = self.collections.read().await;
            collections
                .notifications
                .iter()
                .any(|n| n.id == id && n.is_for(&user.id))
        };
        if !addressed {
            debug!("Ignoring read receipt for notification {}", id);
            return Ok(());
        }

        self.notification_gateway.mark_notification_read(id).await?;
        let mut collections = self.collections.write().await;
        if let Some(notification) = collections.notifications.iter_mut().find(|n| n.id == id) {
            notification.mark_read();
        }
        Ok(())
    }

    pub async fn mark_all_notifications_as_read(&self) -> Result<(), AppError> {
        let Some(user) = self.session.current_user().await else {
            return Ok(());
        };
        self.notification_gateway
            .mark_all_notifications_read(&user.id)
            .await?;
        let mut collections = self.collections.write().await;
        for notification in collections
            .notifications
            .iter_mut()
            .filter(|n| n.is_for(&user.id))
        {
            notification.mark_read();
        }
        Ok(())
    }

    pub async fn activities(&self) -> Vec<Activity> {
        self.collections.read().await.activities.clone()
    }

    pub async fn applications(&self) -> Vec<Application> {
        self.collections.read().await.applications.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.collections.read().await.notifications.clone()
    }

    pub async fn attendance(&self) -> Vec<AttendanceRecord> {
        self.collections.read().await.attendance.clone()
    }

    pub async fn activity_by_id(&self, id: &str) -> Option<Activity> {
        self.collections
            .read()
            .await
            .activities
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub async fn applications_for_activity(&self, activity_id: &str) -> Vec<Application> {
        self.collections
            .read()
            .await
            .applications
            .iter()
            .filter(|a| a.activity_id == activity_id)
            .cloned()
            .collect()
    }

    pub async fn applications_for_student(&self, student_id: &str) -> Vec<Application> {
        self.collections
            .read()
            .await
            .applications
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect()
    }

    pub async fn approved_applications_for_activity(&self, activity_id: &str) -> Vec<Application> {
        self.collections
            .read()
            .await
            .applications
            .iter()
            .filter(|a| a.activity_id == activity_id && a.is_approved())
            .cloned()
            .collect()
    }

    pub async fn attendance_for_activity(&self, activity_id: &str) -> Vec<AttendanceRecord> {
        self.collections
            .read()
            .await
            .attendance
            .iter()
            .filter(|r| r.activity_id == activity_id)
            .cloned()
            .collect()
    }

    /// 本人宛て未読通知の件数
    pub async fn unread_notification_count(&self) -> usize {
        let Some(user) = self.session.current_user().await else {
            return 0;
        };
        self.collections
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.is_for(&user.id) && !n.read)
            .count()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// 通知ポーリングの開始
    ///
    /// 既存のタイマーがあれば置き換える。
    pub async fn start_notification_polling(&self, interval_secs: u64) {
        let mut poller = self.poller.lock().await;
        if let Some(handle) = poller.take() {
            handle.abort();
        }

        let service = self.clone();
        *poller = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
            // 起動直後の即時tickは読み捨てて周期後の発火に揃える
            interval.tick().await;
            loop {
                interval.tick().await;
                service.poll_notifications_once().await;
            }
        }));
    }

    pub async fn stop_notification_polling(&self) {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
    }

    /// フォアグラウンド復帰時の即時再取得フック
    pub async fn notify_foregrounded(&self) {
        self.poll_notifications_once().await;
    }

    async fn poll_notifications_once(&self) {
        if self.session.auth_token().await.is_none() {
            return;
        }
        let Some(user) = self.session.current_user().await else {
            return;
        };
        let filter = self.notification_filter_for(&user);
        match self.notification_gateway.list_notifications(&filter).await {
            Ok(fresh) => self.collections.write().await.notifications = fresh,
            Err(e) => debug!("Notification poll failed: {}", e),
        }
    }

    fn notification_filter_for(&self, user: &User) -> NotificationFilter {
        if user.role.is_admin() {
            NotificationFilter::default()
        } else {
            NotificationFilter {
                recipient_id: Some(user.id.clone()),
            }
        }
    }

    async fn require_identity(&self) -> Result<User, AppError> {
        self.session
            .current_user()
            .await
            .ok_or_else(|| AppError::Unauthenticated("No active session".to_string()))
    }

    async fn approved_application(
        &self,
        activity_id: &str,
        student_id: &str,
    ) -> Result<Application, AppError> {
        let application = {
            let collections = self.collections.read().await;
            collections
                .applications
                .iter()
                .find(|a| a.activity_id == activity_id && a.student_id == student_id)
                .cloned()
        };
        let application = application.ok_or_else(|| {
            AppError::NotFound(format!(
                "No application for student {} in activity {}",
                student_id, activity_id
            ))
        })?;
        if !application.is_approved() {
            return Err(AppError::NotApproved(format!(
                "Application {} is not approved",
                application.id
            )));
        }
        Ok(application)
    }

    fn next_generation(&self) -> u64 {
        self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.refresh_generation.load(Ordering::SeqCst) == generation
    }
}

impl Clone for DataService {
    fn clone(&self) -> Self {
        Self {
            activity_gateway: self.activity_gateway.clone(),
            application_gateway: self.application_gateway.clone(),
            notification_gateway: self.notification_gateway.clone(),
            attendance_gateway: self.attendance_gateway.clone(),
            session: self.session.clone(),
            collections: self.collections.clone(),
            loading: self.loading.clone(),
            refresh_generation: self.refresh_generation.clone(),
            poller: self.poller.clone(),
        }
    }
}
