use async_trait::async_trait;
use chrono::Duration;

use super::entities::{SessionRecord, User};
use super::errors::AuthError;
use super::events::AuthEvent;
use super::session::SessionStore;
use super::value_objects::{Credentials, Password, PasswordHash, RememberToken, SessionId, UserId};

/// Source of staff users for the guard
#[async_trait]
pub trait UserProvider: Send + Sync {
  /// Finds a user by their unique identifier
  async fn retrieve_by_id(&self, id: UserId) -> Result<Option<User>, AuthError>;

  /// Finds a user whose stored remember token matches `token`
  async fn retrieve_by_token(
    &self,
    id: UserId,
    token: &RememberToken,
  ) -> Result<Option<User>, AuthError>;

  /// Replaces the user's remember token (only its hash is stored)
  async fn update_remember_token(&self, id: UserId, token: &RememberToken)
  -> Result<(), AuthError>;

  /// Finds a user by the email in `credentials`; the password is not checked here
  async fn retrieve_by_credentials(
    &self,
    credentials: &Credentials,
  ) -> Result<Option<User>, AuthError>;

  /// Checks the password in `credentials` against the user's stored hash
  async fn validate_credentials(
    &self,
    user: &User,
    credentials: &Credentials,
  ) -> Result<bool, AuthError>;
}

/// The pluggable step that turns a session identifier into a user
#[async_trait]
pub trait UserResolver: Send + Sync {
  /// Resolves the user for `id`, reading whatever session state it needs
  async fn resolve(&self, id: UserId, session: &SessionStore) -> Result<Option<User>, AuthError>;

  /// Records resolver-specific state after a successful login
  fn on_login(&self, _user: &User, _session: &SessionStore) -> Result<(), AuthError> {
    Ok(())
  }

  /// Clears resolver-specific state on logout
  fn on_logout(&self, _session: &SessionStore) {}
}

/// Persistence for session records
#[async_trait]
pub trait SessionRepository: Send + Sync {
  /// Loads a live session; expired or unknown ids yield `None`
  async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, AuthError>;

  /// Stores the record, replacing any previous version, for `ttl`
  async fn save(&self, record: &SessionRecord, ttl: Duration) -> Result<(), AuthError>;

  /// Deletes a session; deleting an unknown id is not an error
  async fn destroy(&self, id: &SessionId) -> Result<(), AuthError>;
}

/// Listener for authentication events
pub trait AuthEventDispatcher: Send + Sync {
  fn dispatch(&self, event: AuthEvent);
}

/// Service trait for password hashing operations
#[async_trait]
pub trait PasswordHasher: Send + Sync {
  /// Hashes a plain text password
  async fn hash(&self, password: &Password) -> Result<PasswordHash, AuthError>;

  /// Verifies a plain text password against a hashed password
  async fn verify(
    &self,
    password: &Password,
    hashed_password: &PasswordHash,
  ) -> Result<bool, AuthError>;
}

/// Service trait for secure token generation
#[async_trait]
pub trait TokenGenerator: Send + Sync {
  /// Generates a fresh remember token
  async fn generate(&self) -> Result<RememberToken, AuthError>;
}
