//! PostgreSQL record store.
//!
//! One table per record kind, each carrying `owner_id`, the tech-data
//! columns, the kind's payload columns and a `deleted` flag. Every read,
//! update and delete is scoped by `id = $1 AND owner_id = $2 AND NOT deleted`,
//! so a record owned by someone else looks exactly like one that never
//! existed.
//!
//! Table and column names are static strings chosen by [`RecordKind`]; only
//! values are ever bound as parameters.

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::model::{
    RecordId, RecordKind, RecordRef, RecordSummary, SecretPayload, SecretRecord, SubjectId,
    TechData, WriteReceipt,
};
use crate::password::CredentialHasher;
use crate::{Storage, StorageError};

const UNIQUE_VIOLATION: &str = "23505";

const fn table_name(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Credential => "credential_records",
        RecordKind::Card => "card_records",
        RecordKind::Text => "text_records",
        RecordKind::Binary => "binary_records",
    }
}

const fn payload_columns(kind: RecordKind) -> &'static [&'static str] {
    match kind {
        RecordKind::Credential => &["login", "password"],
        RecordKind::Card => &["number", "expiry", "cvc", "first_name", "last_name"],
        RecordKind::Text => &["body"],
        RecordKind::Binary => &["data"],
    }
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| StorageError::Database {
        operation,
        reason: e.to_string(),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

fn insert_sql(kind: RecordKind) -> String {
    let columns = payload_columns(kind);
    let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("${}", i + 5)).collect();
    format!(
        "INSERT INTO {} (owner_id, title, tag, comment, {}) VALUES ($1, $2, $3, $4, {}) RETURNING id",
        table_name(kind),
        columns.join(", "),
        placeholders.join(", "),
    )
}

fn select_sql(kind: RecordKind) -> String {
    format!(
        "SELECT title, tag, comment, {} FROM {} WHERE id = $1 AND owner_id = $2 AND NOT deleted",
        payload_columns(kind).join(", "),
        table_name(kind),
    )
}

fn update_sql(kind: RecordKind) -> String {
    let assignments: Vec<String> = payload_columns(kind)
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 6))
        .collect();
    format!(
        "UPDATE {} SET title = $3, tag = $4, comment = $5, {} \
         WHERE id = $1 AND owner_id = $2 AND NOT deleted RETURNING id",
        table_name(kind),
        assignments.join(", "),
    )
}

fn delete_sql(kind: RecordKind) -> String {
    format!(
        "UPDATE {} SET deleted = true WHERE id = $1 AND owner_id = $2 AND NOT deleted",
        table_name(kind),
    )
}

fn list_sql(kind: RecordKind) -> String {
    format!(
        "SELECT id, title, tag, comment FROM {} WHERE owner_id = $1 AND NOT deleted ORDER BY id",
        table_name(kind),
    )
}

fn record_from_row(kind: RecordKind, id: RecordId, row: &PgRow) -> Result<SecretRecord, StorageError> {
    let text = |index: usize| -> Result<String, StorageError> {
        row.try_get::<String, _>(index).map_err(|e| StorageError::Encoding {
            reason: e.to_string(),
        })
    };

    let tech = TechData {
        title: text(0)?,
        tag: text(1)?,
        comment: text(2)?,
    };
    let columns = (3..3 + kind.column_count())
        .map(text)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SecretRecord {
        id,
        payload: SecretPayload::from_columns(kind, columns)?,
        tech,
    })
}

/// A [`Storage`] implementation backed by PostgreSQL.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    hasher: CredentialHasher,
}

impl std::fmt::Debug for PostgresStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStorage {
    /// Open a connection pool. Does not touch the schema; run
    /// [`schema::initialize`](crate::schema::initialize) separately.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the pool cannot connect.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db_error("connect"))?;

        info!(max_connections, "postgres pool connected");
        Ok(Self::new(pool, CredentialHasher::default()))
    }

    #[must_use]
    pub const fn new(pool: PgPool, hasher: CredentialHasher) -> Self {
        Self { pool, hasher }
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Storage for PostgresStorage {
    async fn create_user(&self, login: &str, password: &str) -> Result<SubjectId, StorageError> {
        if self.user_exists(login).await? {
            return Err(StorageError::UserAlreadyExists);
        }

        let password_hash = self.hasher.hash_blocking(password).await?;
        let subject_id = SubjectId::generate();

        // The unique constraint on login settles any race with a concurrent
        // registration that passed the existence check above.
        sqlx::query("INSERT INTO users (subject_id, login, password_hash) VALUES ($1, $2, $3)")
            .bind(*subject_id.as_uuid())
            .bind(login)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::UserAlreadyExists
                } else {
                    db_error("create user")(e)
                }
            })?;

        debug!(subject = %subject_id, "user created");
        Ok(subject_id)
    }

    async fn validate_user(&self, login: &str, password: &str) -> Result<(), StorageError> {
        let stored_hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("validate user"))?;

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
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE login = $1)")
            .bind(login)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("check user"))
    }

    async fn subject_id(&self, login: &str) -> Result<SubjectId, StorageError> {
        let id: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT subject_id FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("look up subject"))?;

        id.map(SubjectId::from_uuid).ok_or(StorageError::UserNotFound)
    }

    async fn insert(
        &self,
        owner: SubjectId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError> {
        let kind = payload.kind();
        let sql = insert_sql(kind);

        let mut query = sqlx::query_scalar::<_, RecordId>(&sql)
            .bind(*owner.as_uuid())
            .bind(&tech.title)
            .bind(&tech.tag)
            .bind(&tech.comment);
        for column in payload.to_columns() {
            query = query.bind(column);
        }

        let id = query
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("insert record"))?;

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
        let sql = select_sql(kind);
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(*owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("select record"))?
            .ok_or(StorageError::NotFound)?;

        record_from_row(kind, id, &row)
    }

    async fn update(
        &self,
        owner: SubjectId,
        id: RecordId,
        payload: &SecretPayload,
        tech: &TechData,
    ) -> Result<WriteReceipt, StorageError> {
        let kind = payload.kind();
        let sql = update_sql(kind);

        let mut query = sqlx::query_scalar::<_, RecordId>(&sql)
            .bind(id)
            .bind(*owner.as_uuid())
            .bind(&tech.title)
            .bind(&tech.tag)
            .bind(&tech.comment);
        for column in payload.to_columns() {
            query = query.bind(column);
        }

        let updated = query
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("update record"))?
            .ok_or(StorageError::NotFound)?;

        debug!(%owner, %kind, id = updated, "record updated");
        Ok(WriteReceipt {
            id: updated,
            title: tech.title.clone(),
        })
    }

    async fn delete(
        &self,
        owner: SubjectId,
        kind: RecordKind,
        id: RecordId,
    ) -> Result<(), StorageError> {
        let sql = delete_sql(kind);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(*owner.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete record"))?;

        debug!(%owner, %kind, id, affected = result.rows_affected(), "record deleted");
        Ok(())
    }

    async fn delete_many(&self, owner: SubjectId, items: &[RecordRef]) -> Result<(), StorageError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(db_error("begin delete"))?;
        let mut affected = 0;
        for item in items {
            let sql = delete_sql(item.kind);
            let result = sqlx::query(&sql)
                .bind(item.id)
                .bind(*owner.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_error("delete records"))?;
            affected += result.rows_affected();
        }
        tx.commit().await.map_err(db_error("commit delete"))?;

        debug!(%owner, requested = items.len(), affected, "records deleted");
        Ok(())
    }

    async fn list_summaries(&self, owner: SubjectId) -> Result<Vec<RecordSummary>, StorageError> {
        let mut summaries = Vec::new();
        for kind in RecordKind::ALL {
            let sql = list_sql(kind);
            let rows: Vec<(RecordId, String, String, String)> = sqlx::query_as(&sql)
                .bind(*owner.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list records"))?;

            summaries.extend(rows.into_iter().map(|(id, title, tag, comment)| RecordSummary {
                id,
                kind,
                title,
                tag,
                comment,
            }));
        }

        Ok(summaries)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("postgres pool closed");
    }
}
