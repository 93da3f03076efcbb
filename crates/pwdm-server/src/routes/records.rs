//! Insert, Get and Update for the four record kinds.
//!
//! One generic handler per operation, instantiated once per kind through
//! [`PayloadFields`]. Request and response bodies carry the tech data
//! (`title`, `tag`, `comment`) flattened alongside the kind's payload fields.
//! Binary payloads travel as standard base64.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use pwdm_core::VerifiedIdentity;
use pwdm_storage::{RecordId, RecordKind, SecretPayload, TechData, WriteReceipt};

use super::ApiJson;
use crate::error::AppError;
use crate::state::AppState;

/// Wire shape of one record kind's payload.
pub trait PayloadFields: Serialize + DeserializeOwned + Send + 'static {
    const KIND: RecordKind;

    fn into_payload(self) -> SecretPayload;

    /// Convert a stored payload back to wire form. `None` if the payload is
    /// of a different kind.
    fn from_payload(payload: SecretPayload) -> Option<Self>;
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialFields {
    pub login: String,
    pub password: String,
}

impl PayloadFields for CredentialFields {
    const KIND: RecordKind = RecordKind::Credential;

    fn into_payload(self) -> SecretPayload {
        SecretPayload::Credential {
            login: self.login,
            password: self.password,
        }
    }

    fn from_payload(payload: SecretPayload) -> Option<Self> {
        match payload {
            SecretPayload::Credential { login, password } => Some(Self { login, password }),
            _ => None,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFields {
    pub number: String,
    pub expiry: String,
    pub cvc: String,
    pub first_name: String,
    pub last_name: String,
}

impl PayloadFields for CardFields {
    const KIND: RecordKind = RecordKind::Card;

    fn into_payload(self) -> SecretPayload {
        SecretPayload::Card {
            number: self.number,
            expiry: self.expiry,
            cvc: self.cvc,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }

    fn from_payload(payload: SecretPayload) -> Option<Self> {
        match payload {
            SecretPayload::Card {
                number,
                expiry,
                cvc,
                first_name,
                last_name,
            } => Some(Self {
                number,
                expiry,
                cvc,
                first_name,
                last_name,
            }),
            _ => None,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFields {
    pub body: String,
}

impl PayloadFields for TextFields {
    const KIND: RecordKind = RecordKind::Text;

    fn into_payload(self) -> SecretPayload {
        SecretPayload::Text { body: self.body }
    }

    fn from_payload(payload: SecretPayload) -> Option<Self> {
        match payload {
            SecretPayload::Text { body } => Some(Self { body }),
            _ => None,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryFields {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl PayloadFields for BinaryFields {
    const KIND: RecordKind = RecordKind::Binary;

    fn into_payload(self) -> SecretPayload {
        SecretPayload::Binary { data: self.data }
    }

    fn from_payload(payload: SecretPayload) -> Option<Self> {
        match payload {
            SecretPayload::Binary { data } => Some(Self { data }),
            _ => None,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Type-agnostic metadata as it appears on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechFields {
    pub title: String,
    pub tag: String,
    pub comment: String,
}

impl From<TechFields> for TechData {
    fn from(fields: TechFields) -> Self {
        Self {
            title: fields.title,
            tag: fields.tag,
            comment: fields.comment,
        }
    }
}

impl From<TechData> for TechFields {
    fn from(tech: TechData) -> Self {
        Self {
            title: tech.title,
            tag: tech.tag,
            comment: tech.comment,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound = "P: PayloadFields")]
pub struct InsertRequest<P> {
    #[serde(flatten)]
    pub payload: P,
    #[serde(flatten)]
    pub tech: TechFields,
    #[serde(rename = "type")]
    pub type_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "P: PayloadFields")]
pub struct UpdateRequest<P> {
    pub id: RecordId,
    #[serde(flatten)]
    pub payload: P,
    #[serde(flatten)]
    pub tech: TechFields,
    #[serde(rename = "type")]
    pub type_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    pub id: RecordId,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub id: RecordId,
    pub title: String,
}

impl From<WriteReceipt> for WriteResponse {
    fn from(receipt: WriteReceipt) -> Self {
        Self {
            id: receipt.id,
            title: receipt.title,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(bound = "P: PayloadFields")]
pub struct RecordResponse<P> {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub type_code: i32,
    #[serde(flatten)]
    pub tech: TechFields,
    #[serde(flatten)]
    pub payload: P,
}

/// A caller-supplied type code, if present, must name the route's kind.
fn check_type_code(kind: RecordKind, type_code: Option<i32>) -> Result<(), AppError> {
    let Some(code) = type_code else {
        return Ok(());
    };
    let claimed = RecordKind::from_code(code)?;
    if claimed == kind {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "type code {code} does not match {kind} record"
        )))
    }
}

/// Store a new record of kind `P::KIND`.
pub async fn insert<P: PayloadFields>(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    ApiJson(body): ApiJson<InsertRequest<P>>,
) -> Result<Json<WriteResponse>, AppError> {
    check_type_code(P::KIND, body.type_code)?;

    let receipt = state
        .storage
        .insert(
            identity.subject(),
            &body.payload.into_payload(),
            &body.tech.into(),
        )
        .await?;

    Ok(Json(receipt.into()))
}

/// Fetch one record of kind `P::KIND` owned by the caller.
pub async fn get<P: PayloadFields>(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    ApiJson(body): ApiJson<GetRequest>,
) -> Result<Json<RecordResponse<P>>, AppError> {
    let record = state
        .storage
        .select(identity.subject(), P::KIND, body.id)
        .await?;

    let id = record.id;
    let payload = P::from_payload(record.payload).ok_or_else(|| {
        AppError::Internal(format!("store returned a non-{} payload for record {id}", P::KIND))
    })?;

    Ok(Json(RecordResponse {
        id,
        type_code: P::KIND.code(),
        tech: record.tech.into(),
        payload,
    }))
}

/// Replace the payload and tech data of a record owned by the caller.
pub async fn update<P: PayloadFields>(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<VerifiedIdentity>,
    ApiJson(body): ApiJson<UpdateRequest<P>>,
) -> Result<Json<WriteResponse>, AppError> {
    check_type_code(P::KIND, body.type_code)?;

    let receipt = state
        .storage
        .update(
            identity.subject(),
            body.id,
            &body.payload.into_payload(),
            &body.tech.into(),
        )
        .await?;

    Ok(Json(receipt.into()))
}
