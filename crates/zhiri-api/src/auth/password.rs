/// Password hashing and the registration password policy
///
/// Hashes are Argon2id PHC strings:
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random
///
/// The PHC string embeds its own parameters, so verification works for
/// hashes produced with any [`PasswordConfig`].
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Characters accepted as the "special" class in passwords
pub const PASSWORD_SPECIALS: &str = "@$!%*?&#";

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Minimal-cost parameters for test fixtures
    pub fn light() -> Self {
        Self {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Hash a plaintext password with these parameters
    ///
    /// # Example
    ///
    /// ```no_run
    /// use zhiri_api::auth::password::{verify_password, PasswordConfig};
    ///
    /// let hash = PasswordConfig::default().hash("Secret1!").unwrap();
    /// assert!(verify_password("Secret1!", &hash).unwrap());
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.to_params()?,
        );

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }
}

/// Verify a plaintext password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash
/// cannot be parsed or checked.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Registration password policy
///
/// At least 8 characters drawn only from ASCII letters, digits and
/// `@$!%*?&#`, with at least one of each: lowercase, uppercase, digit,
/// special.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }

    if let Some(c) = password
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !PASSWORD_SPECIALS.contains(*c))
    {
        return Err(format!("Password contains unsupported character '{c}'"));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(format!(
            "Password must contain at least one of {PASSWORD_SPECIALS}"
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = PasswordConfig::light().hash("Secret1!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secret1!", &hash).unwrap());
        assert!(!verify_password("Secret2!", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let config = PasswordConfig::light();
        let hash1 = config.hash("Secret1!").unwrap();
        let hash2 = config.hash("Secret1!").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("Secret1!", &hash1).unwrap());
        assert!(verify_password("Secret1!", &hash2).unwrap());
    }

    #[test]
    fn test_default_parameters_embedded() {
        let hash = PasswordConfig::default().hash("Secret1!").unwrap();
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_strength("Secret1!").is_ok());
        assert!(validate_password_strength("Abcdef12#").is_ok());

        // too short
        assert!(validate_password_strength("Sec1!").is_err());
        // no uppercase
        assert!(validate_password_strength("secret1!").is_err());
        // no lowercase
        assert!(validate_password_strength("SECRET1!").is_err());
        // no digit
        assert!(validate_password_strength("Secrets!").is_err());
        // no special
        assert!(validate_password_strength("Secret12").is_err());
        // special outside the allowed set
        assert!(validate_password_strength("Secret1!^").is_err());
        assert!(validate_password_strength("Secret 1!").is_err());
        // non-ASCII letters
        assert!(validate_password_strength("Sécret1!").is_err());
    }
}
