//! In-memory record store for tests and local development.
//!
//! All state lives in one structure behind a `RwLock` and is lost when the
//! process exits. Rows are kept in their persisted text form so binary
//! payloads go through the same hex encoding as the relational backend.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::debug;

use crate::model::{
    RecordId, RecordKind, RecordRef, RecordSummary, SecretPayload, SecretRecord, SubjectId,
    TechData, WriteReceipt,
};
use crate::password::CredentialHasher;
use crate::{Storage, StorageError};

#[derive(Debug)]
struct UserRow {
    subject_id: SubjectId,
    password_hash: String,
}

#[derive(Debug)]
struct Row {
    owner: SubjectId,
    tech: TechData,
    columns: Vec<String>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Table {
    last_id: RecordId,
    rows: BTreeMap<RecordId, Row>,
}

impl Table {
    fn live_row_mut(&mut self, owner: SubjectId, id: RecordId) -> Option<&mut Row> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.owner == owner && !row.deleted)
    }

    fn soft_delete(&mut self, owner: SubjectId, id: RecordId) {
        if let Some(row) = self.live_row_mut(owner, id) {
            row.deleted = true;
        }
    }
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, UserRow>,
    tables: [Table; 4],
}

impl State {
    fn table(&self, kind: RecordKind) -> &Table {
        &self.tables[table_index(kind)]
    }

    fn table_mut(&mut self, kind: RecordKind) -> &mut Table {
        &mut self.tables[table_index(kind)]
    }
}

const fn table_index(kind: RecordKind) -> usize {
    match kind {
        RecordKind::Credential => 0,
        RecordKind::Card => 1,
        RecordKind::Text => 2,
        RecordKind::Binary => 3,
    }
}

/// A [`Storage`] implementation held entirely in memory.
#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<State>,
    hasher: CredentialHasher,
}

impl MemoryStorage {
    /// Create an empty store using low-cost password hashing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(CredentialHasher::low_cost())
    }

    /// Create an empty store with a specific password hasher.
    #[must_use]
    pub fn with_hasher(hasher: CredentialHasher) -> Self {
        Self {
            state: RwLock::new(State::default()),
            hasher,
        }
    }

    /// Overwrite the persisted columns of a record, bypassing validation.
    ///
    /// Lets tests simulate on-disk corruption. Returns `false` if no row
    /// with that id exists.
    #[cfg(any(test, feature = "testutil"))]
    pub async fn corrupt_columns(&self, kind: RecordKind, id: RecordId, columns: Vec<String>) -> bool {
        let mut state = self.state.write().await;
        match state.table_mut(kind).rows.get_mut(&id) {
            Some(row) => {
                row.columns = columns;
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn create_user(&self, login: &str, password: &str) -> Result<SubjectId, StorageError> {
        if self.state.read().await.users.contains_key(login) {
            return Err(StorageError::UserAlreadyExists);
        }

        let password_hash = self.hasher.hash_blocking(password).await?;

        // Re-check under the write lock: another task may have registered
        // the same login while we were hashing.
        let mut state = self.state.write().await;
        if state.users.contains_key(login) {
            return Err(StorageError::UserAlreadyExists);
        }

        let subject_id = SubjectId::generate();
        state.users.insert(
            login.to_owned(),
            UserRow {
                subject_id,
                password_hash,
            },
        );
        debug!(subject = %subject_id, "user created");

        Ok(subject_id)
    }

    async fn validate_user(&self, login: &str, password: &str) -> Result<(), StorageError> {
        let stored_hash = {
            let state = self.state.read().await;
            state.users.get(login).map(|u| u.password_hash.clone())
        };

        let Some(stored_hash) = stored_hash else {
            self.hasher.verify_absent_blocking(password).await?;
            return Err(StorageError::InvalidCredentials);
        };

        if self.hasher.verify_blocking(password, &stored_hash).await? {
            Ok(())
        } else {
            Err(StorageError::InvalidCredentials)
        }
    }

    async fn user_exists(&self, login: &str) -> Result<bool, StorageError> {
        Ok(self.state.read().await.users.contains_key(login))
    }

    async fn subject_id(&self, login: &str) -> Result<SubjectId, StorageError> {
        self.state
            .read()
            .await
            .users
            .get(login)
            .map(|u| u.subject_id)
            .ok_or(StorageError::UserNotFound)
    }

    async fn insert(
        &self,
        owner: SubjectId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError> {
        let kind = payload.kind();
        let mut state = self.state.write().await;
        let table = state.table_mut(kind);

        table.last_id = table.last_id.saturating_add(1);
        let id = table.last_id;
        table.rows.insert(
            id,
            Row {
                owner,
                tech: tech.clone(),
                columns: payload.to_columns(),
                deleted: false,
            },
        );
        debug!(%owner, %kind, id, "record inserted");

        Ok(WriteReceipt {
            id,
            title: tech.title.clone(),
        })
    }

    async fn select(
        &self,
        owner: SubjectId,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<SecretRecord, StorageError> {
        let state = self.state.read().await;
        let row = state
            .table(kind)
            .rows
            .get(&id)
            .filter(|row| row.owner == owner && !row.deleted)
            .ok_or(StorageError::NotFound)?;

        Ok(SecretRecord {
            id,
            payload: SecretPayload::from_columns(kind, row.columns.clone())?,
            tech: row.tech.clone(),
        })
    }

    async fn update(
        &self,
        owner: SubjectId,
        id: RecordId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError> {
        let kind = payload.kind();
        let mut state = self.state.write().await;
        let row = state
            .table_mut(kind)
            .live_row_mut(owner, id)
            .ok_or(StorageError::NotFound)?;

        row.tech = tech.clone();
        row.columns = payload.to_columns();
        debug!(%owner, %kind, id, "record updated");

        Ok(WriteReceipt {
            id,
            title: tech.title.clone(),
        })
    }

    async fn delete(
        &self,
        owner: SubjectId,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<(), StorageError> {
        self.state.write().await.table_mut(kind).soft_delete(owner, id);
        debug!(%owner, %kind, id, "record deleted");
        Ok(())
    }

    async fn delete_many(&self, owner: SubjectId, items: &[RecordRef]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for item in items {
            state.table_mut(item.kind).soft_delete(owner, item.id);
        }
        debug!(%owner, count = items.len(), "records deleted");
        Ok(())
    }

    async fn list_summaries(&self, owner: SubjectId) -> Result<Vec<RecordSummary>, StorageError> {
        let guard = self.state.read().await;
        let state: &State = &guard;
        let summaries = RecordKind::ALL
            .into_iter()
            .flat_map(|kind| {
                state
                    .table(kind)
                    .rows
                    .iter()
                    .filter(|(_, row)| row.owner == owner && !row.deleted)
                    .map(move |(id, row)| RecordSummary {
                        id: *id,
                        kind,
                        title: row.tech.title.clone(),
                        tag: row.tech.tag.clone(),
                        comment: row.tech.comment.clone(),
                    })
            })
            .collect();

        Ok(summaries)
    }

    async fn close(&self) {
        debug!("memory storage closed");
    }
}
