//! Authentication middleware for pwdm.
//!
//! Resolves the called method from the request path. `Create` and `Enter`
//! pass through untouched; every other method must carry a `token` header
//! that verifies against the process signing key. The verified caller is
//! injected into the request extensions as a [`VerifiedIdentity`] for
//! handlers to extract.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use pwdm_core::VerifiedIdentity;

use crate::error::{AppError, AuthFailure};
use crate::method::RpcMethod;
use crate::state::AppState;

/// Request header carrying the bearer token.
pub const TOKEN_HEADER: &str = "token";

/// Middleware that validates the `token` header.
///
/// Any [`VerifiedIdentity`] already present in the request extensions is
/// discarded before the call is forwarded, so handlers only ever see the
/// identity this middleware verified.
///
/// # Errors
///
/// Returns [`AppError::Unauthenticated`] if the token is missing or fails
/// verification. The handler is not run.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    req.extensions_mut().remove::<VerifiedIdentity>();

    let method = RpcMethod::from_path(req.uri().path());
    if method.is_some_and(RpcMethod::is_bootstrap) {
        return Ok(next.run(req).await);
    }
    let method_name = method.map_or("unknown", RpcMethod::name);

    let Some(header) = req.headers().get(TOKEN_HEADER) else {
        debug!(method = method_name, "rejected call without token");
        return Err(AppError::Unauthenticated(AuthFailure::MissingToken));
    };
    if header.is_empty() {
        debug!(method = method_name, "rejected call with empty token");
        return Err(AppError::Unauthenticated(AuthFailure::MissingToken));
    }

    let identity = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated(AuthFailure::InvalidToken))
        .and_then(|token| {
            state.tokens.verify(token).map_err(|e| {
                warn!(method = method_name, error = %e, "token verification failed");
                AppError::from(e)
            })
        })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
