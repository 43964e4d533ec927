/// Password Hashing and Verification
///
/// Argon2id with the crate's default (OWASP) parameters. The output is a PHC
/// string such as `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`, so the
/// memory cost, time cost, parallelism and salt travel with the hash and
/// verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Hash a password with Argon2id and a fresh random salt
///
/// # Errors
/// Returns `AppError::Hashing` if Argon2 cannot allocate its working memory
/// or otherwise fails internally.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Hashing(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash
///
/// A mismatch is `Ok(false)`. The digest comparison inside `argon2` is
/// constant time.
///
/// # Errors
/// Returns `AppError::Hashing` only when `hash` is malformed or names
/// parameters Argon2 cannot run with.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Hashing(format!("Invalid password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Hashing(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
