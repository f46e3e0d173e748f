pub mod session;
pub mod web_auth;

// Re-export middleware components for easier access
pub use session::{Auth, AuthContext, SessionSettings, StartSession, auth_context};
pub use web_auth::Authenticate;
