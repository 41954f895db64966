use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, Version};

mod tokens;

pub use tokens::{GenerateTokenRequest, TokenService, VerifyTokenRequest};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Hashing error: {0}")]
    Hashing(String),
    #[error("Password mismatch")]
    Mismatch,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

fn argon2() -> Result<Argon2<'static>, CryptoError> {
    let params = Params::new(
        32_768, // 32 MB
        3,      // iterations
        1,      // parallelism
        None,
    )
    .map_err(|e| CryptoError::Hashing(format!("invalid argon2 params: {e}")))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::Hashing(format!("failed to hash password: {e}")))?
        .to_string();

    Ok(hash)
}

pub fn compare_password(password: &str, hash: &str) -> Result<(), CryptoError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| CryptoError::Hashing(format!("invalid password hash format: {e}")))?;

    match argon2()?.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(()),
        Err(argon2::password_hash::Error::Password) => Err(CryptoError::Mismatch),
        Err(e) => Err(CryptoError::Hashing(format!(
            "password verification failed: {e}"
        ))),
    }
}
