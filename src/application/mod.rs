pub mod ports;
pub mod services;

pub use services::{DataService, SessionService};
