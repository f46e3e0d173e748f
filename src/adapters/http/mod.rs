pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use dtos::{
  AuthStatusResponse, CurrentUserResponse, DashboardResponse, ErrorResponse, LoginRequest,
  LoginResponse, SuccessResponse,
};
pub use errors::{ApiError, AuthErrorKind};
pub use middleware::{Auth, AuthContext, Authenticate, SessionSettings, StartSession};
pub use routes::{configure_auth_routes, configure_web_routes};
