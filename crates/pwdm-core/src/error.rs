//! Error types for `pwdm-core`.
//!
//! Token errors never carry key material or the token text itself.

/// Errors from issuing or verifying bearer tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token was not signed with this process's signing key.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The signature is valid but the subject is missing, empty, or not a
    /// subject id.
    #[error("token claims are invalid")]
    InvalidClaims,

    /// The token's expiry is in the past.
    #[error("token has expired")]
    Expired,

    /// The input is not a token at all.
    #[error("token is malformed")]
    Malformed,

    /// Encoding a new token failed.
    #[error("token signing failed: {reason}")]
    Signing { reason: String },

    /// The OS random number generator could not produce a signing key.
    #[error("signing key generation failed: {reason}")]
    KeyGeneration { reason: String },
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::MissingRequiredClaim(_) => Self::InvalidClaims,
            _ => Self::Malformed,
        }
    }
}
