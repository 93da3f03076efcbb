//! Record model shared by every storage backend.
//!
//! The four secret categories are one closed sum type, [`SecretPayload`],
//! paired with a type-agnostic [`TechData`]. The record kind, and therefore
//! the wire type code, is always derived from the payload variant.
//!
//! Every payload field is persisted as text. [`SecretPayload::to_columns`]
//! and [`SecretPayload::from_columns`] are the single place where that
//! conversion happens, including hex encoding of binary blobs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Store-assigned record identifier. Monotonic per record kind.
pub type RecordId = i64;

/// Opaque identifier of a registered user; the ownership key for records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(Uuid);

impl SubjectId {
    /// Allocate a fresh, globally unique subject id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one read back from the database).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl std::str::FromStr for SubjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ── Record kinds ─────────────────────────────────────────────────────

/// The four categories of secret record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Credential,
    Card,
    Text,
    Binary,
}

impl RecordKind {
    /// Every kind, in the order listings are assembled.
    pub const ALL: [Self; 4] = [Self::Credential, Self::Card, Self::Text, Self::Binary];

    /// Wire type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Credential => 1,
            Self::Card => 2,
            Self::Text => 3,
            Self::Binary => 4,
        }
    }

    /// Resolve a wire type code.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] for an unknown code.
    pub fn from_code(code: i32) -> Result<Self, StorageError> {
        match code {
            1 => Ok(Self::Credential),
            2 => Ok(Self::Card),
            3 => Ok(Self::Text),
            4 => Ok(Self::Binary),
            other => Err(StorageError::InvalidRecord {
                reason: format!("unknown record type code {other}"),
            }),
        }
    }

    /// Number of text columns a payload of this kind persists.
    #[must_use]
    pub const fn column_count(self) -> usize {
        match self {
            Self::Credential => 2,
            Self::Card => 5,
            Self::Text | Self::Binary => 1,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "credential"),
            Self::Card => write!(f, "card"),
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────

/// Metadata attached to every secret record regardless of kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechData {
    pub title: String,
    pub tag: String,
    pub comment: String,
}

/// The secret itself.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretPayload {
    Credential {
        login: String,
        password: String,
    },
    Card {
        number: String,
        expiry: String,
        cvc: String,
        first_name: String,
        last_name: String,
    },
    Text {
        body: String,
    },
    Binary {
        data: Vec<u8>,
    },
}

impl SecretPayload {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Credential { .. } => RecordKind::Credential,
            Self::Card { .. } => RecordKind::Card,
            Self::Text { .. } => RecordKind::Text,
            Self::Binary { .. } => RecordKind::Binary,
        }
    }

    /// Flatten into the persisted text columns, in table column order.
    #[must_use]
    pub fn to_columns(&self) -> Vec<String> {
        match self {
            Self::Credential { login, password } => vec![login.clone(), password.clone()],
            Self::Card {
                number,
                expiry,
                cvc,
                first_name,
                last_name,
            } => vec![
                number.clone(),
                expiry.clone(),
                cvc.clone(),
                first_name.clone(),
                last_name.clone(),
            ],
            Self::Text { body } => vec![body.clone()],
            Self::Binary { data } => vec![hex::encode(data)],
        }
    }

    /// Rebuild a payload from persisted text columns.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if the column count does not match
    /// the kind or a binary column is not valid hex. Mangled bytes are never
    /// returned.
    pub fn from_columns(kind: RecordKind, columns: Vec<String>) -> Result<Self, StorageError> {
        if columns.len() != kind.column_count() {
            return Err(StorageError::Encoding {
                reason: format!(
                    "{kind} record has {} columns, expected {}",
                    columns.len(),
                    kind.column_count()
                ),
            });
        }

        let mut cols = columns.into_iter();
        let mut next = || cols.next().unwrap_or_default();

        let payload = match kind {
            RecordKind::Credential => Self::Credential {
                login: next(),
                password: next(),
            },
            RecordKind::Card => Self::Card {
                number: next(),
                expiry: next(),
                cvc: next(),
                first_name: next(),
                last_name: next(),
            },
            RecordKind::Text => Self::Text { body: next() },
            RecordKind::Binary => {
                let encoded = next();
                let data = hex::decode(&encoded).map_err(|e| StorageError::Encoding {
                    reason: format!("binary payload is not valid hex: {e}"),
                })?;
                Self::Binary { data }
            }
        };

        Ok(payload)
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

/// A stored record as returned by a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: RecordId,
    pub payload: SecretPayload,
    pub tech: TechData,
}

impl SecretRecord {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.payload.kind()
    }
}

/// One entry of a listing: everything but the secret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub id: RecordId,
    pub kind: RecordKind,
    pub title: String,
    pub tag: String,
    pub comment: String,
}

/// Result of an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub id: RecordId,
    pub title: String,
}

/// Reference to a record. Ids are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub id: RecordId,
    pub kind: RecordKind,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_roundtrip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_code(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_type_code_is_invalid_record() {
        assert!(matches!(
            RecordKind::from_code(9),
            Err(StorageError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn binary_payload_is_persisted_as_lowercase_hex() {
        let payload = SecretPayload::Binary {
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        assert_eq!(payload.to_columns(), vec!["deadbeef".to_owned()]);
    }

    #[test]
    fn binary_payload_decodes_back_to_raw_bytes() {
        let payload =
            SecretPayload::from_columns(RecordKind::Binary, vec!["deadbeef".to_owned()]).unwrap();
        assert_eq!(
            payload,
            SecretPayload::Binary {
                data: vec![0xDE, 0xAD, 0xBE, 0xEF]
            }
        );
    }

    #[test]
    fn corrupt_hex_fails_with_encoding_error() {
        let result = SecretPayload::from_columns(RecordKind::Binary, vec!["zz-not-hex".to_owned()]);
        assert!(matches!(result, Err(StorageError::Encoding { .. })));
    }

    #[test]
    fn column_count_mismatch_is_rejected() {
        let result = SecretPayload::from_columns(RecordKind::Card, vec!["4111".to_owned()]);
        assert!(matches!(result, Err(StorageError::Encoding { .. })));
    }

    #[test]
    fn card_columns_keep_field_order() {
        let card = SecretPayload::Card {
            number: "4111111111111111".to_owned(),
            expiry: "12/30".to_owned(),
            cvc: "123".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
        };
        let cols = card.to_columns();
        assert_eq!(SecretPayload::from_columns(RecordKind::Card, cols).unwrap(), card);
    }

    #[test]
    fn debug_does_not_print_secrets() {
        let payload = SecretPayload::Credential {
            login: "alice".to_owned(),
            password: "hunter2".to_owned(),
        };
        let rendered = format!("{payload:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Credential"));
    }

    #[test]
    fn subject_id_parses_its_display_form() {
        let id = SubjectId::generate();
        let parsed: SubjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
