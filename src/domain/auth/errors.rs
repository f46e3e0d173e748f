use thiserror::Error;

use super::value_objects::ValueObjectError;

/// Main authentication error type.
///
/// Guard lookups report a missing user as `Ok(None)`; these variants are for
/// rejected input and backend faults only.
#[derive(Debug, Error)]
pub enum AuthError {
  #[error("Invalid credentials provided")]
  InvalidCredentials,

  #[error("Not authenticated")]
  Unauthenticated,

  #[error("Repository error: {0}")]
  Repository(#[from] RepositoryError),

  #[error("Hash error: {0}")]
  Hash(#[from] HashError),

  #[error("Value object error: {0}")]
  ValueObject(#[from] ValueObjectError),

  #[error("Cookie encryption error: {0}")]
  Encryption(String),
}

/// Storage-related errors (Postgres, Redis, session serialization)
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("Connection failed: {0}")]
  ConnectionFailed(String),

  #[error("Query execution failed: {0}")]
  QueryFailed(String),

  #[error("Record not found")]
  NotFound,

  #[error("Duplicate key violation: {0}")]
  DuplicateKey(String),

  #[error("Serialization failed: {0}")]
  Serialization(String),

  #[error("Database error: {0}")]
  DatabaseError(String),
}

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum HashError {
  #[error("Failed to hash password: {0}")]
  HashingFailed(String),

  #[error("Failed to verify password: {0}")]
  VerificationFailed(String),
}

// Automatic conversions from external error types

impl From<sqlx::Error> for RepositoryError {
  fn from(error: sqlx::Error) -> Self {
    match error {
      sqlx::Error::RowNotFound => RepositoryError::NotFound,
      sqlx::Error::Database(db_err) => {
        if db_err.is_unique_violation() {
          RepositoryError::DuplicateKey(db_err.message().to_string())
        } else {
          RepositoryError::DatabaseError(db_err.message().to_string())
        }
      }
      sqlx::Error::PoolTimedOut => RepositoryError::ConnectionFailed("Pool timed out".to_string()),
      sqlx::Error::PoolClosed => RepositoryError::ConnectionFailed("Pool closed".to_string()),
      _ => RepositoryError::QueryFailed(error.to_string()),
    }
  }
}

impl From<redis::RedisError> for RepositoryError {
  fn from(error: redis::RedisError) -> Self {
    if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
      RepositoryError::ConnectionFailed(error.to_string())
    } else {
      RepositoryError::QueryFailed(error.to_string())
    }
  }
}

impl From<serde_json::Error> for RepositoryError {
  fn from(error: serde_json::Error) -> Self {
    RepositoryError::Serialization(error.to_string())
  }
}

impl From<sqlx::Error> for AuthError {
  fn from(error: sqlx::Error) -> Self {
    AuthError::Repository(RepositoryError::from(error))
  }
}

impl From<redis::RedisError> for AuthError {
  fn from(error: redis::RedisError) -> Self {
    AuthError::Repository(RepositoryError::from(error))
  }
}

impl From<serde_json::Error> for AuthError {
  fn from(error: serde_json::Error) -> Self {
    AuthError::Repository(RepositoryError::from(error))
  }
}
