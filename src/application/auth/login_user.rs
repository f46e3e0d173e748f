use std::sync::Arc;

use crate::domain::auth::entities::{StaffRole, User};
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::guard::Guard;
use crate::domain::auth::value_objects::{Credentials, Email, Password, UserId};

/// Command for logging in a staff member
#[derive(Debug, Clone)]
pub struct LoginUserCommand {
  /// Staff email address
  pub email: String,
  /// Plain text password
  pub password: String,
  /// Whether to issue a remember-me cookie
  pub remember_me: bool,
}

/// Response after a successful login
#[derive(Debug, Clone)]
pub struct LoginUserResponse {
  pub user_id: UserId,
  pub email: String,
  pub full_name: String,
  pub role: StaffRole,
  /// Whether the guard actually issued a remember cookie
  pub remembered: bool,
}

impl LoginUserResponse {
  fn from_user(user: User, remembered: bool) -> Self {
    Self {
      user_id: user.id,
      email: user.email,
      full_name: user.full_name,
      role: user.role,
      remembered,
    }
  }
}

/// Use case for logging in through the request's guard
pub struct LoginUserUseCase {
  guard: Arc<dyn Guard>,
}

impl LoginUserUseCase {
  /// Creates a new instance of LoginUserUseCase
  pub fn new(guard: Arc<dyn Guard>) -> Self {
    Self { guard }
  }

  /// Executes the login use case
  ///
  /// # Errors
  /// Returns `AuthError::InvalidCredentials` when the guard rejects the
  /// credentials, and value-object errors for malformed input.
  pub async fn execute(&self, command: LoginUserCommand) -> Result<LoginUserResponse, AuthError> {
    let email = Email::new(command.email)?;
    let password = Password::new(command.password)?;
    let credentials = Credentials::new(email, password);

    if !self.guard.attempt(&credentials, command.remember_me).await? {
      return Err(AuthError::InvalidCredentials);
    }

    let user = self.guard.user().await?.ok_or(AuthError::Unauthenticated)?;
    Ok(LoginUserResponse::from_user(user, self.guard.issued_recaller()))
  }
}
