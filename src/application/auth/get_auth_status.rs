use std::sync::Arc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::guard::Guard;
use crate::domain::auth::value_objects::UserId;

/// Whether the current request is authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAuthStatusResponse {
  pub guard: String,
  pub authenticated: bool,
  pub user_id: Option<UserId>,
  pub via_remember: bool,
}

/// Use case answering `check()` / `id()` without failing for guests
pub struct GetAuthStatusUseCase {
  guard: Arc<dyn Guard>,
}

impl GetAuthStatusUseCase {
  pub fn new(guard: Arc<dyn Guard>) -> Self {
    Self { guard }
  }

  pub async fn execute(&self) -> Result<GetAuthStatusResponse, AuthError> {
    let user_id = self.guard.id().await?;

    Ok(GetAuthStatusResponse {
      guard: self.guard.name().to_string(),
      authenticated: user_id.is_some(),
      user_id,
      via_remember: self.guard.via_remember(),
    })
  }
}
