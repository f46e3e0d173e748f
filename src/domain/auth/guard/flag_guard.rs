use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Cached, Guard, GuardState};
use crate::domain::auth::entities::User;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::events::AuthEvent;
use crate::domain::auth::ports::AuthEventDispatcher;
use crate::domain::auth::resolvers::{clear_session_state, user_from_session_state, write_session_state};
use crate::domain::auth::session::SessionStore;
use crate::domain::auth::value_objects::Credentials;

/// Guard driven purely by the `auth.user` / `auth.login` session pair.
///
/// It never looks at credentials or cookies: `validate` and `attempt` always
/// answer `false`, and the remember flag passed to `login` is ignored.
pub struct FlagGuard {
  name: String,
  session: SessionStore,
  events: Arc<dyn AuthEventDispatcher>,
  state: Mutex<GuardState>,
}

impl FlagGuard {
  pub fn new(name: impl Into<String>, session: SessionStore, events: Arc<dyn AuthEventDispatcher>) -> Self {
    Self {
      name: name.into(),
      session,
      events,
      state: Mutex::new(GuardState::default()),
    }
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }
}

#[async_trait]
impl Guard for FlagGuard {
  fn name(&self) -> &str {
    &self.name
  }

  async fn user(&self) -> Result<Option<User>, AuthError> {
    let mut state = self.state.lock();

    match state.cached() {
      Cached::LoggedOut => Ok(None),
      Cached::User(user) => Ok(Some(user)),
      Cached::Unresolved => {
        let user = user_from_session_state(&self.session, None);
        if let Some(user) = &user {
          state.user = Some(user.clone());
        }
        Ok(user)
      }
    }
  }

  async fn validate(&self, _credentials: &Credentials) -> Result<bool, AuthError> {
    Ok(false)
  }

  async fn attempt(&self, _credentials: &Credentials, _remember: bool) -> Result<bool, AuthError> {
    Ok(false)
  }

  fn set_user(&self, user: User) {
    self.state.lock().set_user(user);
  }

  fn has_user(&self) -> bool {
    self.state.lock().user.is_some()
  }

  async fn login(&self, user: User, remember: bool) -> Result<(), AuthError> {
    if remember {
      tracing::debug!(
        "Guard '{}' has no remember support; ignoring remember flag for user {}",
        self.name,
        user.id
      );
    }

    write_session_state(&self.session, &user)?;

    self.events.dispatch(AuthEvent::Login {
      guard: self.name.clone(),
      user_id: user.id,
      remember: false,
    });

    tracing::info!("User {} logged in", user.id);
    self.state.lock().set_user(user);
    Ok(())
  }

  async fn logout(&self) -> Result<(), AuthError> {
    let user = self.user().await?;

    clear_session_state(&self.session);

    self.events.dispatch(AuthEvent::Logout {
      guard: self.name.clone(),
      user_id: user.as_ref().map(|user| user.id),
    });

    self.state.lock().log_out();
    Ok(())
  }
}
