//! One-way password hashing for user accounts.
//!
//! Argon2id with a per-hash random salt, stored as a PHC string. Verification
//! re-derives the hash from the candidate password using the parameters
//! embedded in the stored string; nothing is ever reversed.
//!
//! Hashing is CPU-bound, so the async helpers run it on the blocking pool.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::StorageError;

const ABSENT_USER_SALT: [u8; 16] = [0x5a; 16];

/// Hashes and verifies user passwords.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher with explicit Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Hashing`] if the parameters are out of range.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, StorageError> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            StorageError::Hashing {
                reason: format!("invalid argon2 parameters: {e}"),
            }
        })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Minimum-cost parameters for tests and local development.
    #[must_use]
    pub fn low_cost() -> Self {
        let params = Params::new(Params::MIN_M_COST.max(1024), 1, 1, None)
            .unwrap_or_default();
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Hashing`] if the OS RNG fails or Argon2
    /// rejects the input.
    pub fn hash(&self, password: &str) -> Result<String, StorageError> {
        let mut salt_bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| StorageError::Hashing {
                reason: format!("salt generation failed: {e}"),
            })?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| StorageError::Hashing {
            reason: e.to_string(),
        })?;
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| StorageError::Hashing {
                reason: e.to_string(),
            })
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// A malformed stored hash never verifies.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash)
            .is_ok_and(|parsed| self.argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }

    /// Do the work of one [`verify`](Self::verify) for a login with no stored
    /// hash, so unknown logins take as long to reject as wrong passwords.
    /// Always returns `false`.
    #[must_use]
    pub fn verify_absent(&self, password: &str) -> bool {
        let mut output = [0u8; 32];
        let _ = self
            .argon2
            .hash_password_into(password.as_bytes(), &ABSENT_USER_SALT, &mut output);
        false
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Hashing`] if hashing fails or the task panics.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, StorageError> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| StorageError::Hashing {
                reason: format!("hashing task failed: {e}"),
            })?
    }

    /// [`verify_absent`](Self::verify_absent) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Hashing`] if the task panics.
    pub async fn verify_absent_blocking(&self, password: &str) -> Result<bool, StorageError> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify_absent(&password))
            .await
            .map_err(|e| StorageError::Hashing {
                reason: format!("verification task failed: {e}"),
            })
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Hashing`] if the task panics.
    pub async fn verify_blocking(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<bool, StorageError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| StorageError::Hashing {
                reason: format!("verification task failed: {e}"),
            })
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}
