//! One-way password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`) so the salt and
//! cost parameters travel with the hash and verification needs no extra state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashes and verifies user passwords.
#[derive(Clone, Debug)]
pub struct Credentials {
    params: Params,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Credentials {
    /// Build a hasher with explicit Argon2 costs (memory in KiB, iterations, lanes).
    ///
    /// # Errors
    /// Returns an error if the parameters are outside the Argon2 limits.
    pub fn with_costs(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CredentialError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| CredentialError::Params(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a clear-text password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if Argon2 fails to produce a hash.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| CredentialError::Hash(err.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Check a clear-text password against a stored PHC string.
    ///
    /// Malformed stored hashes never verify.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Credentials {
        Credentials::with_costs(8, 1, 1).expect("valid test params")
    }

    #[test]
    fn hash_is_not_the_password() {
        let credentials = cheap();
        let hash = credentials.hash("password").expect("hash");
        assert_ne!(hash, "password");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn hash_uses_fresh_salt() {
        let credentials = cheap();
        let first = credentials.hash("password").expect("hash");
        let second = credentials.hash("password").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let credentials = cheap();
        let hash = credentials.hash("password").expect("hash");
        assert!(credentials.verify("password", &hash));
        assert!(!credentials.verify("password123", &hash));
        assert!(!credentials.verify("", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let credentials = cheap();
        assert!(!credentials.verify("HASHED_PASSWORD", "HASHED_PASSWORD"));
    }

    #[test]
    fn invalid_costs_are_rejected() {
        assert!(Credentials::with_costs(0, 0, 0).is_err());
    }
}
