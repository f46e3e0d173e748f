pub mod auth;
pub mod pages;

pub use auth::{login_handler, logout_handler, me_handler, status_handler};
pub use pages::{dashboard_handler, health_check};
