//! Storage error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. Variants that reach callers over the wire
//! (`NotFound`, `InvalidCredentials`, `UserAlreadyExists`) deliberately
//! carry no detail about *why* they happened, so that a record owned by
//! another subject is indistinguishable from one that never existed.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The login is already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Unknown login or wrong password. Both cases produce this variant.
    #[error("login or password incorrect")]
    InvalidCredentials,

    /// No user is registered under the given login.
    #[error("user not found")]
    UserNotFound,

    /// The record is absent, soft-deleted, or owned by another subject.
    #[error("record not found")]
    NotFound,

    /// The caller supplied a record that cannot be stored as given.
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// The backing database returned an error.
    #[error("database error during {operation}: {reason}")]
    Database { operation: &'static str, reason: String },

    /// Schema initialization failed.
    #[error("schema initialization failed: {reason}")]
    Schema { reason: String },

    /// A persisted value could not be decoded back into its wire form.
    #[error("stored value could not be decoded: {reason}")]
    Encoding { reason: String },

    /// Password hashing or hash verification could not run.
    #[error("password hashing failed: {reason}")]
    Hashing { reason: String },
}

impl StorageError {
    /// Whether this error describes a backend fault rather than a
    /// caller-visible outcome.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::Schema { .. } | Self::Encoding { .. } | Self::Hashing { .. }
        )
    }
}
