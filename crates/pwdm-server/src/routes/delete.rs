//! `DeleteItem` and `DeleteAll`: soft deletion of the caller's records.
//!
//! Both are idempotent. Records that are absent, already deleted, or owned
//! by someone else are skipped without error.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use pwdm_core::VerifiedIdentity;
use pwdm_storage::{RecordId, RecordKind, RecordRef};

use super::ApiJson;
use crate::error::AppError;
use crate::state::AppState;

/// A record reference as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct ItemRef {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub type_code: i32,
}

impl TryFrom<&ItemRef> for RecordRef {
    type Error = AppError;

    fn try_from(item: &ItemRef) -> Result<Self, Self::Error> {
        Ok(Self {
            id: item.id,
            kind: RecordKind::from_code(item.type_code)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteAllRequest {
    #[serde(default)]
    pub items: Vec<ItemRef>,
}

/// Soft-delete one record.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    ApiJson(body): ApiJson<ItemRef>,
) -> Result<StatusCode, AppError> {
    let target = RecordRef::try_from(&body)?;

    state
        .storage
        .delete(identity.subject(), target.kind, target.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete every listed record in one step.
///
/// Every type code is checked before anything is deleted, so one bad entry
/// rejects the whole request.
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    ApiJson(body): ApiJson<DeleteAllRequest>,
) -> Result<StatusCode, AppError> {
    let targets = body
        .items
        .iter()
        .map(RecordRef::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    state
        .storage
        .delete_many(identity.subject(), &targets)
        .await?;

    debug!(subject = %identity.subject(), count = targets.len(), "delete all completed");
    Ok(StatusCode::NO_CONTENT)
}
