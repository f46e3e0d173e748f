use chrono::Duration;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Outgoing cookie queued by the guard.
///
/// Values are plain text here; the HTTP adapter encrypts them on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCookie {
  pub name: String,
  pub value: String,
  /// `None` keeps the cookie for the browser session only
  pub lifetime: Option<Duration>,
}

impl QueuedCookie {
  pub fn new(name: impl Into<String>, value: impl Into<String>, lifetime: Duration) -> Self {
    Self {
      name: name.into(),
      value: value.into(),
      lifetime: Some(lifetime),
    }
  }

  /// Expiring cookie that tells the browser to drop `name`
  pub fn forget(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: String::new(),
      lifetime: Some(Duration::zero()),
    }
  }

  pub fn is_removal(&self) -> bool {
    self.lifetime == Some(Duration::zero())
  }
}

#[derive(Debug, Default)]
struct CookieJarState {
  incoming: HashMap<String, String>,
  queued: Vec<QueuedCookie>,
}

/// Request cookies (already decrypted) plus cookies queued for the response
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
  state: Arc<Mutex<CookieJarState>>,
}

impl CookieJar {
  pub fn new(incoming: HashMap<String, String>) -> Self {
    Self {
      state: Arc::new(Mutex::new(CookieJarState {
        incoming,
        queued: Vec::new(),
      })),
    }
  }

  /// Value sent by the browser with this request
  pub fn get(&self, name: &str) -> Option<String> {
    self.state.lock().incoming.get(name).cloned()
  }

  /// Queues a cookie; a later cookie with the same name replaces it
  pub fn queue(&self, cookie: QueuedCookie) {
    let mut state = self.state.lock();
    state.queued.retain(|queued| queued.name != cookie.name);
    state.queued.push(cookie);
  }

  pub fn forget(&self, name: &str) {
    self.queue(QueuedCookie::forget(name));
  }

  pub fn queued(&self) -> Vec<QueuedCookie> {
    self.state.lock().queued.clone()
  }
}
