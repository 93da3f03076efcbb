//! Shared application state for the pwdm server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the storage backend and the token
//! service, both immutable for the life of the process.

use std::sync::Arc;

use pwdm_core::TokenService;
use pwdm_storage::Storage;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Multi-tenant record store.
    pub storage: Arc<dyn Storage>,
    /// Bearer token issuance and verification.
    pub tokens: TokenService,
}

impl AppState {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenService) -> Self {
        Self { storage, tokens }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
