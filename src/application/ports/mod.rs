pub mod gateway;
pub mod session_store;

pub use gateway::{
    ActivityDraft, ActivityFilter, ActivityGateway, ActivityPatch, ApplicationDraft,
    ApplicationFilter, ApplicationGateway, AttendanceBatch, AttendanceBatchEntry, AttendanceFilter,
    AttendanceGateway, AttendanceSubmission, AuthGateway, AuthSession, AvatarUpload,
    NotificationDraft, NotificationFilter, NotificationGateway, ProfilePatch, UserDraft,
    UserGateway,
};
pub use session_store::{SessionSnapshotStore, TokenCell, TokenStore};
