//! PIN hashing with Argon2id.
//!
//! PINs are short numeric secrets, so the stored form is always a salted
//! Argon2id PHC string and verification is constant-time via the `argon2`
//! crate. The raw PIN exists only in the request body.

use argon2::{
  Argon2,
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use gemba_core::{Error as CoreError, validate};
use rand_core::OsRng;

/// Validates and hashes a raw PIN into a PHC string for storage.
pub fn hash_pin(pin: &str) -> Result<String, CoreError> {
  validate::pin(pin)?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(pin.as_bytes(), &salt)
    .map_err(|e| CoreError::Storage(format!("failed to hash PIN: {e}")))?;
  Ok(hash.to_string())
}

/// Checks a raw PIN against a stored PHC string.
///
/// A malformed stored hash verifies as false rather than erroring; login
/// treats it exactly like a wrong PIN.
pub fn verify_pin(pin: &str, pin_hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(pin_hash) else {
    return false;
  };
  Argon2::default().verify_password(pin.as_bytes(), &parsed).is_ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_and_verify_round_trip() {
    let hash = hash_pin("123456").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_pin("123456", &hash));
    assert!(!verify_pin("654321", &hash));
  }

  #[test]
  fn rejects_out_of_shape_pins() {
    assert!(hash_pin("123").is_err());
    assert!(hash_pin("123456789").is_err());
    assert!(hash_pin("12a456").is_err());
  }

  #[test]
  fn malformed_stored_hash_never_verifies() {
    assert!(!verify_pin("123456", "not-a-phc-string"));
    assert!(!verify_pin("123456", ""));
  }
}
