//! `ListInfo`: summaries of every live record the caller owns.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use pwdm_core::VerifiedIdentity;
use pwdm_storage::{RecordId, RecordSummary};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SummaryItem {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub type_code: i32,
    pub title: String,
    pub tag: String,
    pub comment: String,
}

impl From<RecordSummary> for SummaryItem {
    fn from(summary: RecordSummary) -> Self {
        Self {
            id: summary.id,
            type_code: summary.kind.code(),
            title: summary.title,
            tag: summary.tag,
            comment: summary.comment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInfoResponse {
    pub items: Vec<SummaryItem>,
}

/// List summaries grouped by kind: credentials, cards, texts, binaries.
pub async fn list_info(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> Result<Json<ListInfoResponse>, AppError> {
    let summaries = state.storage.list_summaries(identity.subject()).await?;

    Ok(Json(ListInfoResponse {
        items: summaries.into_iter().map(SummaryItem::from).collect(),
    }))
}
