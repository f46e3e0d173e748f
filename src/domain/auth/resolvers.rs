use async_trait::async_trait;
use std::sync::Arc;

use super::entities::User;
use super::errors::AuthError;
use super::ports::{UserProvider, UserResolver};
use super::session::{AUTH_LOGIN_KEY, AUTH_USER_KEY, SessionStore};
use super::value_objects::UserId;

/// Reads the user stashed in the session.
///
/// The record under `auth.user` counts only when `auth.login` is `true`;
/// either one alone is not a login. When `expected` is given, the record's id
/// must match it as well. Missing or malformed data is absence.
pub fn user_from_session_state(session: &SessionStore, expected: Option<UserId>) -> Option<User> {
  if session.get::<bool>(AUTH_LOGIN_KEY) != Some(true) {
    return None;
  }

  let user = session.get::<User>(AUTH_USER_KEY)?;

  if let Some(expected) = expected {
    if user.id != expected {
      tracing::warn!(
        "Session user {} does not match session identifier {}; ignoring stored record",
        user.id,
        expected
      );
      return None;
    }
  }

  Some(user)
}

/// Writes both session-state keys for `user`
pub(crate) fn write_session_state(session: &SessionStore, user: &User) -> Result<(), AuthError> {
  session.put(AUTH_USER_KEY, user)?;
  session.put(AUTH_LOGIN_KEY, true)
}

pub(crate) fn clear_session_state(session: &SessionStore) {
  session.remove(AUTH_USER_KEY);
  session.remove(AUTH_LOGIN_KEY);
}

/// Resolves users from the `auth.user` / `auth.login` session pair
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStateResolver;

impl SessionStateResolver {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl UserResolver for SessionStateResolver {
  async fn resolve(&self, id: UserId, session: &SessionStore) -> Result<Option<User>, AuthError> {
    Ok(user_from_session_state(session, Some(id)))
  }

  fn on_login(&self, user: &User, session: &SessionStore) -> Result<(), AuthError> {
    write_session_state(session, user)
  }

  fn on_logout(&self, session: &SessionStore) {
    clear_session_state(session);
  }
}

/// Resolves users by looking the identifier up in the user provider
pub struct ProviderResolver {
  provider: Arc<dyn UserProvider>,
}

impl ProviderResolver {
  pub fn new(provider: Arc<dyn UserProvider>) -> Self {
    Self { provider }
  }
}

#[async_trait]
impl UserResolver for ProviderResolver {
  async fn resolve(&self, id: UserId, _session: &SessionStore) -> Result<Option<User>, AuthError> {
    self.provider.retrieve_by_id(id).await
  }
}
