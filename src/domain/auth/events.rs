use serde::Serialize;

use super::value_objects::UserId;

/// Observable authentication events.
///
/// Dispatched by the guards for audit listeners; resolution never depends on
/// what a listener does with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
  /// Credentials were submitted to `attempt`
  Attempting {
    guard: String,
    email: String,
    remember: bool,
  },
  /// Submitted credentials matched a user
  Validated { guard: String, user_id: UserId },
  /// Submitted credentials were rejected
  Failed {
    guard: String,
    email: String,
    user_id: Option<UserId>,
  },
  /// A user was restored from session state
  Authenticated { guard: String, user_id: UserId },
  /// A user logged in, explicitly or through the remember cookie
  Login {
    guard: String,
    user_id: UserId,
    remember: bool,
  },
  /// The current user logged out
  Logout {
    guard: String,
    user_id: Option<UserId>,
  },
}

impl AuthEvent {
  /// Short name used as the audit log message
  pub fn name(&self) -> &'static str {
    match self {
      AuthEvent::Attempting { .. } => "attempting",
      AuthEvent::Validated { .. } => "validated",
      AuthEvent::Failed { .. } => "failed",
      AuthEvent::Authenticated { .. } => "authenticated",
      AuthEvent::Login { .. } => "login",
      AuthEvent::Logout { .. } => "logout",
    }
  }

  pub fn guard(&self) -> &str {
    match self {
      AuthEvent::Attempting { guard, .. }
      | AuthEvent::Validated { guard, .. }
      | AuthEvent::Failed { guard, .. }
      | AuthEvent::Authenticated { guard, .. }
      | AuthEvent::Login { guard, .. }
      | AuthEvent::Logout { guard, .. } => guard,
    }
  }

  pub fn user_id(&self) -> Option<UserId> {
    match self {
      AuthEvent::Attempting { .. } => None,
      AuthEvent::Validated { user_id, .. }
      | AuthEvent::Authenticated { user_id, .. }
      | AuthEvent::Login { user_id, .. } => Some(*user_id),
      AuthEvent::Failed { user_id, .. } | AuthEvent::Logout { user_id, .. } => *user_id,
    }
  }
}
