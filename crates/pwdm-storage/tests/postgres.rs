//! PostgreSQL store against the shared storage checks.
//!
//! Needs a live database. Set `PWDM_TEST_DATABASE_URL` and run with
//! `--ignored`.

#![cfg(feature = "postgres-backend")]
#![allow(clippy::expect_used)]

use pwdm_storage::{CredentialHasher, PostgresStorage, Storage, conformance, schema};

async fn connect() -> Option<PostgresStorage> {
    let url = std::env::var("PWDM_TEST_DATABASE_URL").ok()?;
    let store = PostgresStorage::connect(&url, 4)
        .await
        .expect("connect to test database");
    schema::initialize(store.pool())
        .await
        .expect("initialize schema");
    Some(PostgresStorage::new(store.pool().clone(), CredentialHasher::low_cost()))
}

#[tokio::test]
#[ignore = "requires PWDM_TEST_DATABASE_URL"]
async fn postgres_storage_passes_conformance_suite() {
    let Some(store) = connect().await else {
        return;
    };
    conformance::run_all(&store).await;
    store.close().await;
}

#[tokio::test]
#[ignore = "requires PWDM_TEST_DATABASE_URL"]
async fn schema_initialization_is_idempotent() {
    let Some(store) = connect().await else {
        return;
    };
    schema::initialize(store.pool())
        .await
        .expect("second initialization");
    store.close().await;
}
