//! PostgreSQL schema for the record store.
//!
//! One `users` table plus one table per record kind. Every statement is
//! idempotent, so [`initialize`] can run on every startup. The record store
//! itself never checks for the schema at call time; if this was not run,
//! queries simply fail.

use sqlx::PgPool;
use tracing::info;

use crate::StorageError;

const STATEMENTS: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        subject_id    UUID PRIMARY KEY,
        login         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS credential_records (
        id       BIGSERIAL PRIMARY KEY,
        owner_id UUID    NOT NULL REFERENCES users (subject_id),
        title    TEXT    NOT NULL DEFAULT '',
        tag      TEXT    NOT NULL DEFAULT '',
        comment  TEXT    NOT NULL DEFAULT '',
        login    TEXT    NOT NULL DEFAULT '',
        password TEXT    NOT NULL DEFAULT '',
        deleted  BOOLEAN NOT NULL DEFAULT false
    )",
    r"CREATE TABLE IF NOT EXISTS card_records (
        id         BIGSERIAL PRIMARY KEY,
        owner_id   UUID    NOT NULL REFERENCES users (subject_id),
        title      TEXT    NOT NULL DEFAULT '',
        tag        TEXT    NOT NULL DEFAULT '',
        comment    TEXT    NOT NULL DEFAULT '',
        number     TEXT    NOT NULL DEFAULT '',
        expiry     TEXT    NOT NULL DEFAULT '',
        cvc        TEXT    NOT NULL DEFAULT '',
        first_name TEXT    NOT NULL DEFAULT '',
        last_name  TEXT    NOT NULL DEFAULT '',
        deleted    BOOLEAN NOT NULL DEFAULT false
    )",
    r"CREATE TABLE IF NOT EXISTS text_records (
        id       BIGSERIAL PRIMARY KEY,
        owner_id UUID    NOT NULL REFERENCES users (subject_id),
        title    TEXT    NOT NULL DEFAULT '',
        tag      TEXT    NOT NULL DEFAULT '',
        comment  TEXT    NOT NULL DEFAULT '',
        body     TEXT    NOT NULL DEFAULT '',
        deleted  BOOLEAN NOT NULL DEFAULT false
    )",
    r"CREATE TABLE IF NOT EXISTS binary_records (
        id       BIGSERIAL PRIMARY KEY,
        owner_id UUID    NOT NULL REFERENCES users (subject_id),
        title    TEXT    NOT NULL DEFAULT '',
        tag      TEXT    NOT NULL DEFAULT '',
        comment  TEXT    NOT NULL DEFAULT '',
        data     TEXT    NOT NULL DEFAULT '',
        deleted  BOOLEAN NOT NULL DEFAULT false
    )",
    "CREATE INDEX IF NOT EXISTS idx_credential_records_owner ON credential_records (owner_id) WHERE NOT deleted",
    "CREATE INDEX IF NOT EXISTS idx_card_records_owner ON card_records (owner_id) WHERE NOT deleted",
    "CREATE INDEX IF NOT EXISTS idx_text_records_owner ON text_records (owner_id) WHERE NOT deleted",
    "CREATE INDEX IF NOT EXISTS idx_binary_records_owner ON binary_records (owner_id) WHERE NOT deleted",
];

/// Create every table and index the record store needs.
///
/// # Errors
///
/// Returns [`StorageError::Schema`] if any statement fails.
pub async fn initialize(pool: &PgPool) -> Result<(), StorageError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Schema {
                reason: e.to_string(),
            })?;
    }

    info!(statements = STATEMENTS.len(), "schema initialized");
    Ok(())
}
