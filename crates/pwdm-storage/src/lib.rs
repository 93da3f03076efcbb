//! Storage contract for the pwdm secret vault.
//!
//! This crate defines the [`Storage`] trait, the operation set a backend must
//! satisfy to hold user accounts and the four kinds of secret
//! record. Every record operation takes the owner's [`SubjectId`] and every
//! backend scopes its reads, updates and deletes by `(id, owner, not deleted)`.
//!
//! Two implementations are provided:
//!
//! - [`PostgresStorage`]: production backend, one table per record kind
//!   (feature `postgres-backend`)
//! - [`MemoryStorage`]: in-memory, for tests and local development
//!
//! With the `testutil` feature, `conformance` holds the behavioural test
//! suite both are checked against.

#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::missing_panics_doc)]
pub mod conformance;
mod error;
mod memory;
pub mod model;
pub mod password;
#[cfg(feature = "postgres-backend")]
mod postgres;
#[cfg(feature = "postgres-backend")]
pub mod schema;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use model::{
    RecordId, RecordKind, RecordRef, RecordSummary, SecretPayload, SecretRecord, SubjectId,
    TechData, WriteReceipt,
};
pub use password::CredentialHasher;
#[cfg(feature = "postgres-backend")]
pub use postgres::PostgresStorage;

/// A multi-tenant secret store.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// Every operation other than [`list_summaries`](Storage::list_summaries) is a
/// single atomic round trip to the backend.
#[async_trait::async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Register a new user and return its freshly assigned subject id.
    ///
    /// The password is hashed before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UserAlreadyExists`] if the login is taken.
    async fn create_user(&self, login: &str, password: &str) -> Result<SubjectId, StorageError>;

    /// Check a login/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidCredentials`] when the login is unknown
    /// *or* the password is wrong; the two cases are indistinguishable.
    async fn validate_user(&self, login: &str, password: &str) -> Result<(), StorageError>;

    /// Whether a user with this login exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the backend fails.
    async fn user_exists(&self, login: &str) -> Result<bool, StorageError>;

    /// Look up the subject id registered for a login.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UserNotFound`] if no such user exists.
    async fn subject_id(&self, login: &str) -> Result<SubjectId, StorageError>;

    /// Store a new record owned by `owner`. The id is assigned by the store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the backend fails.
    async fn insert(
        &self,
        owner: SubjectId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError>;

    /// Fetch one live record of the given kind owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the record never existed, was
    /// deleted, or belongs to another owner. Returns
    /// [`StorageError::Encoding`] if a stored binary payload is corrupt.
    async fn select(
        &self,
        owner: SubjectId,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<SecretRecord, StorageError>;

    /// Replace the payload and metadata of a live record owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] under the same conditions as
    /// [`select`](Storage::select).
    async fn update(
        &self,
        owner: SubjectId,
        id: RecordId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError>;

    /// Soft-delete a record. Deleting an absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the backend fails.
    async fn delete(
        &self,
        owner: SubjectId,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<(), StorageError>;

    /// Soft-delete every listed record owned by `owner`, skipping any that
    /// are absent. Either all listed records are processed or none are.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the backend fails.
    async fn delete_many(&self, owner: SubjectId, items: &[RecordRef]) -> Result<(), StorageError>;

    /// Summaries of every live record owned by `owner`, grouped by kind in
    /// the order credential, card, text, binary.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the backend fails.
    async fn list_summaries(&self, owner: SubjectId) -> Result<Vec<RecordSummary>, StorageError>;

    /// Release backend resources. Called exactly once, after the last
    /// request has completed.
    async fn close(&self);
}
