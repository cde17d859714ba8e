pub mod application_status;
pub mod attendance_status;
pub mod user_role;
pub mod user_status;

pub use application_status::ApplicationStatus;
pub use attendance_status::AttendanceStatus;
pub use user_role::UserRole;
pub use user_status::UserStatus;
