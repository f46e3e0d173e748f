use aes_gcm::{
  Aes256Gcm, Nonce,
  aead::{Aead, KeyInit, Payload},
};
use base64::{
  Engine as _,
  engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rand::RngCore;

const NONCE_LEN: usize = 12;

/// Error types for cookie encryption
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
  #[error("Invalid encryption key: {0}")]
  InvalidKey(String),

  #[error("Encryption failed: {0}")]
  EncryptionFailed(String),

  #[error("Decryption failed: {0}")]
  DecryptionFailed(String),
}

/// AES-256-GCM encryption for cookie values
///
/// The output is base64url of `nonce (12 bytes) || ciphertext`. The cookie
/// name is bound in as associated data, so a value lifted from one cookie
/// does not decrypt under another name.
#[derive(Clone)]
pub struct CookieEncrypter {
  cipher: Aes256Gcm,
}

impl CookieEncrypter {
  /// Create a cookie encrypter
  ///
  /// # Arguments
  /// * `key_base64` - Base64-encoded 32-byte key (`openssl rand -base64 32`)
  pub fn new(key_base64: &str) -> Result<Self, EncryptionError> {
    let key_bytes = STANDARD
      .decode(key_base64.trim())
      .map_err(|e| EncryptionError::InvalidKey(format!("Key decode failed: {}", e)))?;

    let key_array: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
      EncryptionError::InvalidKey("Encryption key must be exactly 32 bytes (256 bits)".to_string())
    })?;

    Ok(Self {
      cipher: Aes256Gcm::new((&key_array).into()),
    })
  }

  pub fn encrypt(&self, name: &str, plaintext: &str) -> Result<String, EncryptionError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = self
      .cipher
      .encrypt(
        nonce,
        Payload {
          msg: plaintext.as_bytes(),
          aad: name.as_bytes(),
        },
      )
      .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(combined))
  }

  pub fn decrypt(&self, name: &str, encoded: &str) -> Result<String, EncryptionError> {
    let combined = URL_SAFE_NO_PAD
      .decode(encoded)
      .map_err(|e| EncryptionError::DecryptionFailed(format!("Base64 decode failed: {}", e)))?;

    if combined.len() < NONCE_LEN {
      return Err(EncryptionError::DecryptionFailed(
        "Invalid ciphertext format: too short".to_string(),
      ));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let plaintext = self
      .cipher
      .decrypt(
        Nonce::from_slice(nonce_bytes),
        Payload {
          msg: ciphertext,
          aad: name.as_bytes(),
        },
      )
      .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext)
      .map_err(|e| EncryptionError::DecryptionFailed(format!("UTF-8 conversion failed: {}", e)))
  }
}
