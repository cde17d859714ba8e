pub mod activity;
pub mod application;
pub mod attendance;
pub mod notification;
pub mod user;

pub use activity::Activity;
pub use application::Application;
pub use attendance::AttendanceRecord;
pub use notification::Notification;
pub use user::User;
