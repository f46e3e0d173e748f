//! Authentication guards.
//!
//! A guard answers "who is the current request's user" for one request.
//! [`SessionGuard`] is the full guard: pluggable user resolution, a
//! remember-cookie fallback, and credential checks through the user provider.
//! [`FlagGuard`] only consumes the `auth.user` / `auth.login` session pair
//! written by some other login path.

mod flag_guard;
mod session_guard;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::entities::User;
use super::errors::AuthError;
use super::value_objects::{Credentials, UserId};

pub use flag_guard::FlagGuard;
pub use session_guard::{SessionGuard, SessionGuardDependencies};

/// Operations the HTTP layer expects from any guard.
///
/// A missing user is `Ok(None)` / `Ok(false)`; `Err` means a backend fault.
#[async_trait]
pub trait Guard: Send + Sync {
  /// Guard name, used for session keys and event tagging
  fn name(&self) -> &str;

  /// The current user, resolved at most once per request
  async fn user(&self) -> Result<Option<User>, AuthError>;

  async fn check(&self) -> Result<bool, AuthError> {
    Ok(self.user().await?.is_some())
  }

  async fn guest(&self) -> Result<bool, AuthError> {
    Ok(!self.check().await?)
  }

  async fn id(&self) -> Result<Option<UserId>, AuthError> {
    Ok(self.user().await?.map(|user| user.id))
  }

  /// Checks credentials without logging in
  async fn validate(&self, credentials: &Credentials) -> Result<bool, AuthError>;

  /// Checks credentials and logs the user in when they match
  async fn attempt(&self, credentials: &Credentials, remember: bool) -> Result<bool, AuthError>;

  /// Forces the cached user for the rest of the request
  fn set_user(&self, user: User);

  /// True when a user is cached, without triggering resolution
  fn has_user(&self) -> bool;

  async fn login(&self, user: User, remember: bool) -> Result<(), AuthError>;

  async fn logout(&self) -> Result<(), AuthError>;

  /// True when the current user came from the remember cookie
  fn via_remember(&self) -> bool {
    false
  }

  /// True when a login in this request queued a remember cookie
  fn issued_recaller(&self) -> bool {
    false
  }
}

/// Per-request resolution state shared by both guards
#[derive(Debug, Default)]
struct GuardState {
  user: Option<User>,
  logged_out: bool,
  via_remember: bool,
  issued_recaller: bool,
}

enum Cached {
  LoggedOut,
  User(User),
  Unresolved,
}

impl GuardState {
  fn cached(&self) -> Cached {
    if self.logged_out {
      return Cached::LoggedOut;
    }
    match &self.user {
      Some(user) => Cached::User(user.clone()),
      None => Cached::Unresolved,
    }
  }

  fn set_user(&mut self, user: User) {
    self.user = Some(user);
    self.logged_out = false;
  }

  fn log_out(&mut self) {
    self.user = None;
    self.logged_out = true;
    self.via_remember = false;
    self.issued_recaller = false;
  }
}

fn guard_digest(name: &str) -> String {
  hex::encode(Sha256::digest(name.as_bytes()))
}

/// Session key holding the identifier of the user logged in through `guard`
pub fn login_key(guard: &str) -> String {
  format!("login_{}_{}", guard, guard_digest(guard))
}

/// Name of the remember-me cookie issued by `guard`
pub fn recaller_name(guard: &str) -> String {
  format!("remember_{}_{}", guard, guard_digest(guard))
}
