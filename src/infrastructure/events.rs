use parking_lot::Mutex;

use crate::domain::auth::events::AuthEvent;
use crate::domain::auth::ports::AuthEventDispatcher;

/// Writes every auth event to the `audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventDispatcher;

impl TracingEventDispatcher {
  pub fn new() -> Self {
    Self
  }
}

impl AuthEventDispatcher for TracingEventDispatcher {
  fn dispatch(&self, event: AuthEvent) {
    let user_id = event.user_id().map(|id| id.value());

    match &event {
      AuthEvent::Failed { email, .. } => tracing::warn!(
        target: "audit",
        event = event.name(),
        guard = event.guard(),
        user_id,
        email = email.as_str(),
        "authentication failed"
      ),
      AuthEvent::Login { remember, .. } => tracing::info!(
        target: "audit",
        event = event.name(),
        guard = event.guard(),
        user_id,
        remember = *remember,
        "login"
      ),
      _ => tracing::debug!(
        target: "audit",
        event = event.name(),
        guard = event.guard(),
        user_id,
        "auth event"
      ),
    }
  }
}

/// Keeps dispatched events in memory, in order
#[derive(Debug, Default)]
pub struct MemoryEventDispatcher {
  events: Mutex<Vec<AuthEvent>>,
}

impl MemoryEventDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<AuthEvent> {
    self.events.lock().clone()
  }

  pub fn clear(&self) {
    self.events.lock().clear();
  }
}

impl AuthEventDispatcher for MemoryEventDispatcher {
  fn dispatch(&self, event: AuthEvent) {
    self.events.lock().push(event);
  }
}
