mod argon2_hasher;
mod cookie_encryption;
mod token_generator;

pub use argon2_hasher::Argon2PasswordHasher;
pub use cookie_encryption::{CookieEncrypter, EncryptionError};
pub use token_generator::SecureTokenGenerator;
