use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::auth::entities::StaffRole;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::guard::Guard;
use crate::domain::auth::value_objects::UserId;

/// Response containing current user information
#[derive(Debug, Clone)]
pub struct GetCurrentUserResponse {
  pub user_id: UserId,
  pub email: String,
  pub full_name: String,
  pub role: StaffRole,
  /// Timestamp when the account was created
  pub created_at: DateTime<Utc>,
  /// True when the user was restored from the remember cookie
  pub via_remember: bool,
}

/// Use case for getting the current authenticated user
pub struct GetCurrentUserUseCase {
  guard: Arc<dyn Guard>,
}

impl GetCurrentUserUseCase {
  /// Creates a new instance of GetCurrentUserUseCase
  pub fn new(guard: Arc<dyn Guard>) -> Self {
    Self { guard }
  }

  /// # Errors
  /// Returns `AuthError::Unauthenticated` when the request has no user
  pub async fn execute(&self) -> Result<GetCurrentUserResponse, AuthError> {
    let user = self.guard.user().await?.ok_or(AuthError::Unauthenticated)?;

    Ok(GetCurrentUserResponse {
      user_id: user.id,
      email: user.email,
      full_name: user.full_name,
      role: user.role,
      created_at: user.created_at,
      via_remember: self.guard.via_remember(),
    })
  }
}
