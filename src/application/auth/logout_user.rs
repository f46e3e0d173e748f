use std::sync::Arc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::guard::Guard;

/// Use case for logging out the current request's user
pub struct LogoutUserUseCase {
  guard: Arc<dyn Guard>,
}

impl LogoutUserUseCase {
  /// Creates a new instance of LogoutUserUseCase
  pub fn new(guard: Arc<dyn Guard>) -> Self {
    Self { guard }
  }

  /// Logs out; logging out a guest is not an error
  pub async fn execute(&self) -> Result<(), AuthError> {
    self.guard.logout().await
  }
}
