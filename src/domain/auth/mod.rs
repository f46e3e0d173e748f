pub mod cookies;
pub mod entities;
pub mod errors;
pub mod events;
pub mod guard;
pub mod ports;
pub mod resolvers;
pub mod services;
pub mod session;
pub mod value_objects;

// Re-export commonly used types
pub use cookies::{CookieJar, QueuedCookie};
pub use entities::{SessionRecord, StaffRole, User};
pub use errors::{AuthError, HashError, RepositoryError};
pub use events::AuthEvent;
pub use guard::{FlagGuard, Guard, SessionGuard, SessionGuardDependencies};
pub use resolvers::{ProviderResolver, SessionStateResolver, user_from_session_state};
pub use services::{AuthManager, AuthManagerConfig, GuardDriver};
pub use session::SessionStore;
pub use value_objects::{
  Credentials, Email, Password, PasswordHash, Recaller, RememberToken, SessionId, TokenHash,
  UserId,
};
