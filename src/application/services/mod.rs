pub mod data_service;
pub mod session_service;

pub use data_service::{ApplicationUpdate, DataService, NewActivity, NewApplication};
pub use session_service::{SessionService, SessionStatus};
