//! Authentication use cases
//!
//! Each use case wraps the guard built for the current request and turns its
//! answers into application responses.

mod get_auth_status;
mod get_current_user;
mod login_user;
mod logout_user;

pub use get_auth_status::{GetAuthStatusResponse, GetAuthStatusUseCase};
pub use get_current_user::{GetCurrentUserResponse, GetCurrentUserUseCase};
pub use login_user::{LoginUserCommand, LoginUserResponse, LoginUserUseCase};
pub use logout_user::LogoutUserUseCase;

#[cfg(test)]
pub(crate) mod test_support {
  use std::sync::Arc;

  use crate::domain::auth::{
    AuthManager, AuthManagerConfig, CookieJar, Guard, SessionStore, StaffRole, User, UserId,
  };
  use crate::infrastructure::events::MemoryEventDispatcher;
  use crate::infrastructure::persistence::memory::MemoryUserProvider;
  use crate::infrastructure::security::SecureTokenGenerator;

  pub const EMAIL: &str = "attending@example.org";
  pub const PASSWORD: &str = "rounds-at-seven";

  /// Manager backed by in-memory services with one physician on file
  pub fn manager() -> AuthManager {
    let provider = Arc::new(MemoryUserProvider::new());
    provider
      .insert(
        User::new(
          UserId::new(11).unwrap(),
          EMAIL.to_string(),
          "Attending Physician".to_string(),
          StaffRole::Physician,
        ),
        PASSWORD,
      )
      .unwrap();

    AuthManager::new(
      provider,
      Arc::new(SecureTokenGenerator::new()),
      Arc::new(MemoryEventDispatcher::new()),
      AuthManagerConfig::default(),
    )
  }

  pub fn guard(manager: &AuthManager, session: &SessionStore) -> Arc<dyn Guard> {
    manager.guard(session.clone(), CookieJar::default())
  }
}
