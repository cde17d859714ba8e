use crate::application::ports::gateway::{
    ActivityDraft, ActivityFilter, ActivityGateway, ActivityPatch, ApplicationDraft,
    ApplicationFilter, ApplicationGateway, AttendanceBatch, AttendanceFilter, AttendanceGateway,
    AttendanceSubmission, AuthGateway, AuthSession, AvatarUpload, NotificationDraft,
    NotificationFilter, NotificationGateway, ProfilePatch, UserDraft, UserGateway,
};
use crate::application::ports::session_store::TokenCell;
use crate::domain::entities::{Activity, Application, AttendanceRecord, Notification, User};
use crate::domain::value_objects::ApplicationStatus;
use crate::shared::config::GatewayConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    user: User,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// RESTバックエンドへのゲートウェイアダプタ
///
/// 認証トークンは共有セルから読み、存在する間は
/// Bearerヘッダーとして全リクエストに付与する。
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: TokenCell,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig, token: TokenCell) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, build_url(&self.base_url, path));
        match self.token.get().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

async fn request_json<T: DeserializeOwned>(
    builder: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(error_from_response(status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|err| AppError::Gateway(format!("Malformed gateway response: {err}")))
}

async fn request_unit(builder: reqwest::RequestBuilder) -> Result<(), AppError> {
    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_from_response(status, &body));
    }
    Ok(())
}

fn error_from_response(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("Gateway returned {status}"));
    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthenticated(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Gateway(message),
    }
}

#[async_trait]
impl ActivityGateway for HttpGateway {
    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError> {
        let mut builder = self.request(Method::GET, "/api/activities").await;
        if let Some(category) = filter.category.clone() {
            builder = builder.query(&[("category", category)]);
        }
        if let Some(status) = filter.status.clone() {
            builder = builder.query(&[("status", status)]);
        }
        let envelope: DataEnvelope<Vec<Activity>> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn get_activity(&self, id: &str) -> Result<Activity, AppError> {
        let builder = self
            .request(Method::GET, &format!("/api/activities/{id}"))
            .await;
        let envelope: DataEnvelope<Activity> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn create_activity(&self, draft: &ActivityDraft) -> Result<Activity, AppError> {
        let builder = self.request(Method::POST, "/api/activities").await.json(draft);
        let envelope: DataEnvelope<Activity> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn update_activity(
        &self,
        id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, AppError> {
        let builder = self
            .request(Method::PUT, &format!("/api/activities/{id}"))
            .await
            .json(patch);
        let envelope: DataEnvelope<Activity> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        let builder = self
            .request(Method::DELETE, &format!("/api/activities/{id}"))
            .await;
        request_unit(builder).await
    }
}

#[async_trait]
impl ApplicationGateway for HttpGateway {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, AppError> {
        let mut builder = self.request(Method::GET, "/api/applications").await;
        if let Some(student_id) = filter.student_id.clone() {
            builder = builder.query(&[("studentId", student_id)]);
        }
        if let Some(activity_id) = filter.activity_id.clone() {
            builder = builder.query(&[("activityId", activity_id)]);
        }
        let envelope: DataEnvelope<Vec<Application>> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn create_application(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<Application, AppError> {
        let builder = self
            .request(Method::POST, "/api/applications")
            .await
            .json(draft);
        let envelope: DataEnvelope<Application> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<(), AppError> {
        let mut body = json!({ "status": status });
        if let Some(notes) = notes {
            body["notes"] = json!(notes);
        }
        let builder = self
            .request(Method::PUT, &format!("/api/applications/{id}/status"))
            .await
            .json(&body);
        request_unit(builder).await
    }
}

#[async_trait]
impl NotificationGateway for HttpGateway {
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, AppError> {
        let mut builder = self.request(Method::GET, "/api/notifications").await;
        if let Some(recipient_id) = filter.recipient_id.clone() {
            builder = builder.query(&[("recipientId", recipient_id)]);
        }
        let envelope: DataEnvelope<Vec<Notification>> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn create_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, AppError> {
        let builder = self
            .request(Method::POST, "/api/notifications")
            .await
            .json(draft);
        let envelope: DataEnvelope<Notification> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        let builder = self
            .request(Method::PUT, &format!("/api/notifications/{id}/read"))
            .await;
        request_unit(builder).await
    }

    async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<(), AppError> {
        let builder = self
            .request(Method::PUT, "/api/notifications/read-all")
            .await
            .json(&json!({ "recipientId": recipient_id }));
        request_unit(builder).await
    }
}

#[async_trait]
impl AttendanceGateway for HttpGateway {
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let mut builder = self.request(Method::GET, "/api/attendance").await;
        if let Some(student_id) = filter.student_id.clone() {
            builder = builder.query(&[("studentId", student_id)]);
        }
        if let Some(activity_id) = filter.activity_id.clone() {
            builder = builder.query(&[("activityId", activity_id)]);
        }
        let envelope: DataEnvelope<Vec<AttendanceRecord>> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), AppError> {
        let builder = self
            .request(Method::POST, "/api/attendance")
            .await
            .json(submission);
        request_unit(builder).await
    }

    async fn mark_attendance_batch(&self, batch: &AttendanceBatch) -> Result<(), AppError> {
        let builder = self
            .request(Method::POST, "/api/attendance/batch")
            .await
            .json(batch);
        request_unit(builder).await
    }
}

#[async_trait]
impl UserGateway for HttpGateway {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let builder = self.request(Method::GET, "/api/users").await;
        let envelope: DataEnvelope<Vec<User>> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<User, AppError> {
        let builder = self.request(Method::POST, "/api/users").await.json(draft);
        let envelope: DataEnvelope<User> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn update_user(&self, id: &str, patch: &ProfilePatch) -> Result<User, AppError> {
        let builder = self
            .request(Method::PUT, &format!("/api/users/{id}"))
            .await
            .json(patch);
        let envelope: DataEnvelope<User> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let builder = self
            .request(Method::DELETE, &format!("/api/users/{id}"))
            .await;
        request_unit(builder).await
    }

    async fn toggle_user_status(&self, id: &str) -> Result<User, AppError> {
        let builder = self
            .request(Method::PUT, &format!("/api/users/{id}/status"))
            .await;
        let envelope: DataEnvelope<User> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn upload_avatar(&self, id: &str, upload: &AvatarUpload) -> Result<User, AppError> {
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)?;
        let form = multipart::Form::new().part("avatar", part);
        let builder = self
            .request(Method::POST, &format!("/api/users/{id}/avatar"))
            .await
            .multipart(form);
        let envelope: DataEnvelope<User> = request_json(builder).await?;
        Ok(envelope.data)
    }

    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let builder = self
            .request(Method::PUT, "/api/users/me/password")
            .await
            .json(&json!({
                "oldPassword": old_password,
                "newPassword": new_password,
            }));
        request_unit(builder).await
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let builder = self
            .request(Method::POST, "/api/auth/login")
            .await
            .json(&json!({ "email": email, "password": password }));
        let envelope: LoginEnvelope = request_json(builder).await?;
        Ok(AuthSession {
            token: envelope.token,
            user: envelope.user,
        })
    }

    async fn verify_session(&self) -> Result<User, AppError> {
        let builder = self.request(Method::GET, "/api/auth/me").await;
        let envelope: IdentityEnvelope = request_json(builder).await?;
        Ok(envelope.user)
    }
}
