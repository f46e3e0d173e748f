use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash as Argon2PasswordHash, PasswordHasher};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::ValidateEmail;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ValueObjectError {
  #[error("Invalid email format: {0}")]
  InvalidEmail(String),

  #[error("Password is required")]
  PasswordEmpty,

  #[error("Password is too long (maximum 128 characters)")]
  PasswordTooLong,

  #[error("Invalid password hash format")]
  InvalidPasswordHash,

  #[error("Password hashing failed: {0}")]
  HashingFailed(String),

  #[error("Invalid user identifier: {0}")]
  InvalidUserId(String),

  #[error("Unknown staff role: {0}")]
  InvalidRole(String),

  #[error("Invalid session identifier")]
  InvalidSessionId,

  #[error("Invalid remember token")]
  InvalidRememberToken,
}

// ============================================================================
// UserId Value Object
// ============================================================================

/// Identifier of a staff user, as stored under the guard's session key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
  /// Creates a UserId, rejecting non-positive values
  pub fn new(id: i64) -> Result<Self, ValueObjectError> {
    if id <= 0 {
      return Err(ValueObjectError::InvalidUserId(id.to_string()));
    }
    Ok(Self(id))
  }

  pub fn value(&self) -> i64 {
    self.0
  }
}

impl FromStr for UserId {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let id = s
      .parse::<i64>()
      .map_err(|_| ValueObjectError::InvalidUserId(s.to_string()))?;
    Self::new(id)
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ============================================================================
// Email Value Object
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
  /// Creates a new Email after validation
  pub fn new(email: impl Into<String>) -> Result<Self, ValueObjectError> {
    let email = email.into();
    let trimmed = email.trim();

    if !trimmed.validate_email() {
      return Err(ValueObjectError::InvalidEmail(email));
    }

    // Normalize to lowercase
    Ok(Self(trimmed.to_lowercase()))
  }

  /// Returns the email as a string slice
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Consumes self and returns the inner String
  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for Email {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl AsRef<str> for Email {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

// ============================================================================
// Password Value Object (Plain Password - Never Stored)
// ============================================================================

/// Plain-text password as submitted at login; wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
  const MAX_LENGTH: usize = 128;

  /// Creates a new Password.
  ///
  /// Login only rejects empty or oversized input; strength rules belong to
  /// whoever provisions staff accounts.
  pub fn new(password: impl Into<String>) -> Result<Self, ValueObjectError> {
    let password = password.into();

    if password.is_empty() {
      return Err(ValueObjectError::PasswordEmpty);
    }

    if password.len() > Self::MAX_LENGTH {
      return Err(ValueObjectError::PasswordTooLong);
    }

    Ok(Self(password))
  }

  /// Hashes the password using Argon2id with default parameters
  pub fn hash(&self) -> Result<PasswordHash, ValueObjectError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);

    let hash = Argon2::default()
      .hash_password(self.0.as_bytes(), &salt)
      .map_err(|e| ValueObjectError::HashingFailed(e.to_string()))?;

    Ok(PasswordHash(hash.to_string()))
  }

  /// Returns the password as a string slice (use with caution)
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Password {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Password(***)")
  }
}

// ============================================================================
// PasswordHash Value Object (Argon2id Hash)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
  /// Creates a new PasswordHash from an existing PHC string
  pub fn from_hash(hash: impl Into<String>) -> Result<Self, ValueObjectError> {
    let hash = hash.into();

    Argon2PasswordHash::new(&hash).map_err(|_| ValueObjectError::InvalidPasswordHash)?;

    Ok(Self(hash))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

// ============================================================================
// Credentials
// ============================================================================

/// Email and password pair submitted to `attempt` / `validate`
#[derive(Debug, Clone)]
pub struct Credentials {
  pub email: Email,
  pub password: Password,
}

impl Credentials {
  pub fn new(email: Email, password: Password) -> Self {
    Self { email, password }
  }
}

// ============================================================================
// SessionId Value Object
// ============================================================================

/// Random identifier correlating a browser to its server-side session
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
  const BYTE_LENGTH: usize = 32; // 256 bits, hex encoded

  /// Generates a fresh session identifier from the OS RNG
  pub fn generate() -> Self {
    let mut bytes = [0u8; Self::BYTE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Self(hex::encode(bytes))
  }

  /// Parses an identifier read back from the session cookie
  pub fn parse(id: impl Into<String>) -> Result<Self, ValueObjectError> {
    let id = id.into();

    if id.len() != Self::BYTE_LENGTH * 2 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(ValueObjectError::InvalidSessionId);
    }

    Ok(Self(id.to_ascii_lowercase()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

// Session ids are bearer secrets; keep them out of logs.
impl fmt::Debug for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SessionId({}…)", &self.0[..8.min(self.0.len())])
  }
}

// ============================================================================
// RememberToken / TokenHash Value Objects
// ============================================================================

/// Long-lived token carried inside the recaller cookie
#[derive(Clone, PartialEq, Eq)]
pub struct RememberToken(String);

impl RememberToken {
  /// Wraps a token, rejecting empty values and the recaller separator
  pub fn from_string(token: impl Into<String>) -> Result<Self, ValueObjectError> {
    let token = token.into();

    if token.is_empty() || token.contains('|') || token.chars().any(char::is_whitespace) {
      return Err(ValueObjectError::InvalidRememberToken);
    }

    Ok(Self(token))
  }

  /// SHA-256 digest of the token; only the digest is persisted
  pub fn hash(&self) -> TokenHash {
    let digest = Sha256::digest(self.0.as_bytes());
    TokenHash(hex::encode(digest))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for RememberToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("RememberToken(***)")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHash(String);

impl TokenHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

// ============================================================================
// Recaller (remember-me cookie payload)
// ============================================================================

/// Decrypted remember cookie: `"{user_id}|{token}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recaller {
  id: UserId,
  token: RememberToken,
}

impl Recaller {
  pub fn new(id: UserId, token: RememberToken) -> Self {
    Self { id, token }
  }

  /// Parses a cookie value. Anything malformed is simply not a recaller.
  pub fn parse(value: &str) -> Option<Self> {
    let (id, token) = value.split_once('|')?;
    let id = id.parse::<UserId>().ok()?;
    let token = RememberToken::from_string(token).ok()?;
    Some(Self { id, token })
  }

  pub fn id(&self) -> UserId {
    self.id
  }

  pub fn token(&self) -> &RememberToken {
    &self.token
  }

  /// Serializes back into the cookie payload format
  pub fn to_cookie_value(&self) -> String {
    format!("{}|{}", self.id, self.token.as_str())
  }
}
