//! In-process backends for local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::auth::{
  entities::{SessionRecord, User},
  errors::{AuthError, RepositoryError},
  ports::{PasswordHasher, SessionRepository, UserProvider},
  value_objects::{
    Credentials, Email, Password, PasswordHash, RememberToken, SessionId, TokenHash, UserId,
  },
};
use crate::infrastructure::security::Argon2PasswordHasher;

struct StoredSession {
  record: SessionRecord,
  expires_at: DateTime<Utc>,
}

/// Session repository held in a process-local map
#[derive(Default)]
pub struct MemorySessionRepository {
  sessions: RwLock<HashMap<SessionId, StoredSession>>,
}

impl MemorySessionRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored sessions, expired ones included
  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
  async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, AuthError> {
    let mut sessions = self.sessions.write();

    match sessions.get(id) {
      Some(stored) if stored.expires_at > Utc::now() => Ok(Some(stored.record.clone())),
      Some(_) => {
        sessions.remove(id);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn save(&self, record: &SessionRecord, ttl: Duration) -> Result<(), AuthError> {
    let now = Utc::now();
    let mut sessions = self.sessions.write();

    // Abandoned sessions are never loaded again, so sweep them here
    sessions.retain(|_, stored| stored.expires_at > now);
    sessions.insert(
      record.id.clone(),
      StoredSession {
        record: record.clone(),
        expires_at: now + ttl,
      },
    );
    Ok(())
  }

  async fn destroy(&self, id: &SessionId) -> Result<(), AuthError> {
    self.sessions.write().remove(id);
    Ok(())
  }
}

struct StoredUser {
  user: User,
  password_hash: PasswordHash,
  remember_token_hash: Option<TokenHash>,
}

/// User provider over an in-memory staff list
pub struct MemoryUserProvider {
  users: RwLock<HashMap<UserId, StoredUser>>,
  hasher: Arc<dyn PasswordHasher>,
}

impl MemoryUserProvider {
  pub fn new() -> Self {
    Self::with_hasher(Arc::new(Argon2PasswordHasher::default()))
  }

  pub fn with_hasher(hasher: Arc<dyn PasswordHasher>) -> Self {
    Self {
      users: RwLock::new(HashMap::new()),
      hasher,
    }
  }

  /// Adds a staff member with the given plain-text password.
  ///
  /// The email is normalized the same way login input is.
  pub fn insert(&self, mut user: User, password: &str) -> Result<User, AuthError> {
    user.email = Email::new(user.email)?.into_inner();
    let password_hash = Password::new(password)?.hash()?;
    let mut users = self.users.write();

    if users.values().any(|stored| stored.user.email == user.email) {
      return Err(AuthError::Repository(RepositoryError::DuplicateKey(
        user.email.clone(),
      )));
    }

    users.insert(
      user.id,
      StoredUser {
        user: user.clone(),
        password_hash,
        remember_token_hash: None,
      },
    );
    Ok(user)
  }

  /// Hash of the user's current remember token
  pub fn remember_token_hash(&self, id: UserId) -> Option<TokenHash> {
    self
      .users
      .read()
      .get(&id)
      .and_then(|stored| stored.remember_token_hash.clone())
  }
}

impl Default for MemoryUserProvider {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl UserProvider for MemoryUserProvider {
  async fn retrieve_by_id(&self, id: UserId) -> Result<Option<User>, AuthError> {
    Ok(self.users.read().get(&id).map(|stored| stored.user.clone()))
  }

  async fn retrieve_by_token(
    &self,
    id: UserId,
    token: &RememberToken,
  ) -> Result<Option<User>, AuthError> {
    let hash = token.hash();

    Ok(
      self
        .users
        .read()
        .get(&id)
        .filter(|stored| stored.remember_token_hash.as_ref() == Some(&hash))
        .map(|stored| stored.user.clone()),
    )
  }

  async fn update_remember_token(
    &self,
    id: UserId,
    token: &RememberToken,
  ) -> Result<(), AuthError> {
    match self.users.write().get_mut(&id) {
      Some(stored) => {
        stored.remember_token_hash = Some(token.hash());
        Ok(())
      }
      None => Err(AuthError::Repository(RepositoryError::NotFound)),
    }
  }

  async fn retrieve_by_credentials(
    &self,
    credentials: &Credentials,
  ) -> Result<Option<User>, AuthError> {
    Ok(
      self
        .users
        .read()
        .values()
        .find(|stored| stored.user.email == credentials.email.as_str())
        .map(|stored| stored.user.clone()),
    )
  }

  async fn validate_credentials(
    &self,
    user: &User,
    credentials: &Credentials,
  ) -> Result<bool, AuthError> {
    let hash = self
      .users
      .read()
      .get(&user.id)
      .map(|stored| stored.password_hash.clone());

    match hash {
      Some(hash) => self.hasher.verify(&credentials.password, &hash).await,
      None => Ok(false),
    }
  }
}
