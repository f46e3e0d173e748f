//! Per-request session handle.
//!
//! The `StartSession` middleware loads a [`SessionRecord`] once per request,
//! wraps it in a [`SessionStore`], and hands clones of the handle to the
//! guard. Reads and writes are purely in memory; the middleware persists the
//! result after the handler returns.

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::entities::SessionRecord;
use super::errors::AuthError;
use super::value_objects::SessionId;

/// Serialized staff record written by the session-state login path
pub const AUTH_USER_KEY: &str = "auth.user";

/// Boolean marker that must accompany `auth.user`
pub const AUTH_LOGIN_KEY: &str = "auth.login";

#[derive(Debug)]
struct SessionState {
  id: SessionId,
  attributes: Map<String, Value>,
  is_new: bool,
  dirty: bool,
  previous_id: Option<SessionId>,
}

/// Cheaply cloneable handle to the current request's session
#[derive(Debug, Clone)]
pub struct SessionStore {
  state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
  /// Starts an empty session under a fresh identifier
  pub fn start() -> Self {
    Self::with_state(SessionState {
      id: SessionId::generate(),
      attributes: Map::new(),
      is_new: true,
      dirty: false,
      previous_id: None,
    })
  }

  /// Wraps a session loaded from the repository
  pub fn from_record(record: SessionRecord) -> Self {
    Self::with_state(SessionState {
      id: record.id,
      attributes: record.attributes,
      is_new: false,
      dirty: false,
      previous_id: None,
    })
  }

  fn with_state(state: SessionState) -> Self {
    Self {
      state: Arc::new(Mutex::new(state)),
    }
  }

  pub fn id(&self) -> SessionId {
    self.state.lock().id.clone()
  }

  /// Reads a value, treating a missing key or a type mismatch as absent
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let value = self.state.lock().attributes.get(key).cloned()?;

    match serde_json::from_value(value) {
      Ok(value) => Some(value),
      Err(e) => {
        tracing::debug!("Ignoring malformed session value under '{}': {}", key, e);
        None
      }
    }
  }

  pub fn has(&self, key: &str) -> bool {
    self.state.lock().attributes.contains_key(key)
  }

  pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), AuthError> {
    let value = serde_json::to_value(value)?;

    let mut state = self.state.lock();
    state.attributes.insert(key.to_string(), value);
    state.dirty = true;
    Ok(())
  }

  /// Removes a key, returning whether it was present
  pub fn remove(&self, key: &str) -> bool {
    let mut state = self.state.lock();
    let removed = state.attributes.remove(key).is_some();
    if removed {
      state.dirty = true;
    }
    removed
  }

  /// Moves the session to a new identifier, keeping its attributes.
  ///
  /// The old identifier is remembered so the middleware can destroy it.
  pub fn migrate(&self) {
    let mut state = self.state.lock();
    let old_id = std::mem::replace(&mut state.id, SessionId::generate());

    // A session that was never persisted has nothing to destroy
    if !state.is_new && state.previous_id.is_none() {
      state.previous_id = Some(old_id);
    }
    state.dirty = true;
  }

  /// True when the attributes or identifier changed during this request
  pub fn is_dirty(&self) -> bool {
    self.state.lock().dirty
  }

  pub fn is_new(&self) -> bool {
    self.state.lock().is_new
  }

  /// Identifier abandoned by `migrate`, if the old one was persisted
  pub fn previous_id(&self) -> Option<SessionId> {
    self.state.lock().previous_id.clone()
  }

  pub fn is_empty(&self) -> bool {
    self.state.lock().attributes.is_empty()
  }

  /// Snapshot for persistence
  pub fn to_record(&self) -> SessionRecord {
    let state = self.state.lock();
    SessionRecord::new(state.id.clone(), state.attributes.clone())
  }
}
