//! Bearer tokens for authenticated calls.
//!
//! A token is a compact HS256 JWT carrying the caller's subject id and an
//! expiry. The HMAC key is generated once per process and lives only in
//! memory, so restarting the server invalidates every outstanding token.
//!
//! # Security model
//!
//! - The signing key is 32 bytes from the OS CSPRNG, zeroized on drop.
//! - Verification allows no clock leeway: a token is expired once `now > exp`.
//! - Only HS256 is accepted; a token claiming any other algorithm fails as an
//!   invalid signature.
//! - [`VerifiedIdentity`] has no public constructor. Holding one proves the
//!   token was checked.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pwdm_storage::SubjectId;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::TokenError;

/// Default token lifetime, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// A 256-bit HMAC key, zeroized on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey([u8; 32]);

impl SigningKey {
    /// Draw a fresh key from the OS random number generator.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeyGeneration`] if the OS RNG is unavailable.
    pub fn generate() -> Result<Self, TokenError> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::KeyGeneration {
                reason: e.to_string(),
            })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: String,
    exp: i64,
    iat: i64,
}

/// The caller's subject id, as proven by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: SubjectId,
}

impl VerifiedIdentity {
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }
}

/// Issues and verifies bearer tokens with one process-scoped key.
pub struct TokenService {
    key: SigningKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key,
            ttl,
            validation,
        }
    }

    /// The lifetime given to tokens from [`issue`](Self::issue).
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` with the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the token cannot be encoded.
    pub fn issue(&self, subject: SubjectId) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, self.ttl)
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the expiry overflows or the token
    /// cannot be encoded.
    pub fn issue_with_ttl(&self, subject: SubjectId, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing {
                reason: "token expiry out of range".to_owned(),
            })?;

        let token = self.sign(&Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        })?;

        debug!(%subject, expires_at = %expires_at, "token issued");
        Ok(token)
    }

    /// Check a token's signature and expiry and extract its subject.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidSignature`] if the token was not signed by this key
    /// - [`TokenError::Expired`] if its expiry has passed
    /// - [`TokenError::InvalidClaims`] if the subject is missing or unparsable
    /// - [`TokenError::Malformed`] if the input is not a token
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let decoding_key = DecodingKey::from_secret(self.key.as_bytes());
        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &self.validation)?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::InvalidClaims);
        }
        let subject = data
            .claims
            .sub
            .parse::<SubjectId>()
            .map_err(|_| TokenError::InvalidClaims)?;

        Ok(VerifiedIdentity { subject })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let encoding_key = EncodingKey::from_secret(self.key.as_bytes());
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &encoding_key).map_err(|e| {
            TokenError::Signing {
                reason: e.to_string(),
            }
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
