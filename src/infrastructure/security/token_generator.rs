use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::TokenGenerator;
use crate::domain::auth::value_objects::RememberToken;

/// Number of random bytes behind each remember token
const TOKEN_BYTES: usize = 32;

/// Secure token generator using cryptographically secure random number generation
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureTokenGenerator;

impl SecureTokenGenerator {
  /// Creates a new instance of SecureTokenGenerator
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl TokenGenerator for SecureTokenGenerator {
  /// Generates a remember token from 32 bytes of OS randomness.
  ///
  /// The token is base64url without padding, so it never contains the `|`
  /// separator used in the recaller cookie.
  async fn generate(&self) -> Result<RememberToken, AuthError> {
    let mut token_bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut token_bytes);

    Ok(RememberToken::from_string(URL_SAFE_NO_PAD.encode(token_bytes))?)
  }
}
