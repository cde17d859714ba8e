#![allow(unused_imports)]

pub mod entities;
pub mod value_objects;

pub use entities::{Activity, Application, AttendanceRecord, Notification, User};
pub use value_objects::{ApplicationStatus, AttendanceStatus, UserRole, UserStatus};
