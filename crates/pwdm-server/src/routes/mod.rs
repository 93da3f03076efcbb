//! HTTP route handlers for the pwdm remote-call API.
//!
//! Every method is a `POST` with a JSON body. [`build_router`] wires all of
//! them behind the auth middleware.

pub mod auth;
pub mod delete;
pub mod info;
pub mod records;

use std::sync::Arc;

use axum::extract::FromRequest;
use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use axum::routing::post;
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::method::RpcMethod;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Concurrent account creations and logins allowed at once. Both run a
/// memory-hard password hash.
const BOOTSTRAP_CONCURRENCY: usize = 16;

/// JSON body extractor whose rejections use the standard error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Put every route of `routes` behind one shared pool of `max` in-flight
/// requests.
fn shared_limit<S>(routes: Router<S>, max: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(GlobalConcurrencyLimitLayer::new(max))
}

/// Build the Axum router with all methods and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let bootstrap_routes = shared_limit(
        Router::new()
            .route(RpcMethod::Create.path(), post(auth::create))
            .route(RpcMethod::Enter.path(), post(auth::enter)),
        BOOTSTRAP_CONCURRENCY,
    );

    let record_routes = Router::new()
        .route(
            RpcMethod::InsertCredential.path(),
            post(records::insert::<records::CredentialFields>),
        )
        .route(
            RpcMethod::InsertCard.path(),
            post(records::insert::<records::CardFields>),
        )
        .route(
            RpcMethod::InsertText.path(),
            post(records::insert::<records::TextFields>),
        )
        .route(
            RpcMethod::InsertBinary.path(),
            post(records::insert::<records::BinaryFields>),
        )
        .route(
            RpcMethod::GetCredential.path(),
            post(records::get::<records::CredentialFields>),
        )
        .route(RpcMethod::GetCard.path(), post(records::get::<records::CardFields>))
        .route(RpcMethod::GetText.path(), post(records::get::<records::TextFields>))
        .route(
            RpcMethod::GetBinary.path(),
            post(records::get::<records::BinaryFields>),
        )
        .route(
            RpcMethod::UpdateCredential.path(),
            post(records::update::<records::CredentialFields>),
        )
        .route(
            RpcMethod::UpdateCard.path(),
            post(records::update::<records::CardFields>),
        )
        .route(
            RpcMethod::UpdateText.path(),
            post(records::update::<records::TextFields>),
        )
        .route(
            RpcMethod::UpdateBinary.path(),
            post(records::update::<records::BinaryFields>),
        )
        .route(RpcMethod::DeleteItem.path(), post(delete::delete_item))
        .route(RpcMethod::DeleteAll.path(), post(delete::delete_all))
        .route(RpcMethod::ListInfo.path(), post(info::list_info));

    Router::new()
        .merge(bootstrap_routes)
        .merge(record_routes)
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}
