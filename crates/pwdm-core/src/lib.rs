//! Core library for the pwdm secret vault.
//!
//! Holds the process-scoped signing key and the [`TokenService`] that issues
//! and verifies bearer tokens. A successful verification yields a
//! [`VerifiedIdentity`], the only value request handlers accept as proof of
//! who is calling.

pub mod error;
pub mod token;

pub use error::TokenError;
pub use token::{DEFAULT_TTL_SECS, SigningKey, TokenService, VerifiedIdentity};
