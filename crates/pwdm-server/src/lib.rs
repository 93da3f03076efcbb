//! pwdm HTTP server.
//!
//! Wires the storage backend and token service into an Axum router that
//! serves the remote-call API at `POST /v1/<Method>`.

pub mod config;
pub mod error;
pub mod method;
pub mod middleware;
pub mod routes;
pub mod state;
