//! PIN hashing and the attempt-tracking behind study access control.
//!
//! A Study's `security_hash` is a scrypt password hash of its PIN — distinct
//! from `base::crypto`'s PBKDF2-derived file-encryption key, which is a
//! separate derivation over the same `(study_id, pin)` pair used only for
//! sealing media, never stored.

use base::{err, Error};
use scrypt::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::OnceLock;

struct Params {
    actual: scrypt::Params,
}

static PARAMS: OnceLock<Params> = OnceLock::new();

fn params() -> &'static Params {
    PARAMS.get_or_init(|| Params {
        actual: scrypt::Params::recommended(),
    })
}

/// For tests only: swaps in cheap scrypt cost parameters so the test suite
/// doesn't spend real time hashing PINs. Must be called, if at all, before
/// any other call into this module.
pub fn set_test_params() {
    let _ = PARAMS.set(Params {
        actual: scrypt::Params::new(8, 8, 1, 32).expect("test scrypt params are valid"),
    });
}

/// Hashes a PIN for storage in `Study.security_hash`.
pub fn hash_pin(pin: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut scrypt::password_hash::rand_core::OsRng);
    let hash = scrypt::Scrypt
        .hash_password_customized(pin.as_bytes(), None, None, params().actual, &salt)
        .map_err(|e| err!(Internal, "failed to hash pin: {e}"))?;
    Ok(hash.to_string())
}

/// Verifies `pin` against a stored hash produced by [`hash_pin`].
pub fn verify_pin(stored_hash: &str, pin: &str) -> Result<bool, Error> {
    let hash = PasswordHash::new(stored_hash)
        .map_err(|e| err!(DataLoss, "corrupt stored pin hash: {e}"))?;
    match scrypt::Scrypt.verify_password(pin.as_bytes(), &hash) {
        Ok(()) => Ok(true),
        Err(scrypt::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(err!(Internal, "failed to verify pin: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        set_test_params();
        let hash = hash_pin("4242").unwrap();
        assert!(verify_pin(&hash, "4242").unwrap());
        assert!(!verify_pin(&hash, "0000").unwrap());
    }
}
