//! Behavioural checks every [`Storage`] backend must pass.
//!
//! Each check registers its own uniquely named users, so the suite can run
//! against a shared database without cleanup between runs. Backends call
//! [`run_all`] from an integration test; individual checks are public so a
//! failing one can be run alone.

use crate::model::{RecordKind, RecordRef, SecretPayload, SubjectId, TechData};
use crate::{Storage, StorageError};

fn unique_login(prefix: &str) -> String {
    format!("{prefix}-{}", SubjectId::generate())
}

async fn register(store: &dyn Storage, prefix: &str) -> SubjectId {
    store
        .create_user(&unique_login(prefix), "pw")
        .await
        .expect("register user")
}

fn tech(title: &str) -> TechData {
    TechData {
        title: title.to_owned(),
        tag: format!("{title}-tag"),
        comment: format!("{title}-comment"),
    }
}

fn credential(login: &str, password: &str) -> SecretPayload {
    SecretPayload::Credential {
        login: login.to_owned(),
        password: password.to_owned(),
    }
}

fn card() -> SecretPayload {
    SecretPayload::Card {
        number: "4111111111111111".to_owned(),
        expiry: "12/30".to_owned(),
        cvc: "123".to_owned(),
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
    }
}

fn text(body: &str) -> SecretPayload {
    SecretPayload::Text {
        body: body.to_owned(),
    }
}

/// Run every check in this module against one store.
pub async fn run_all(store: &dyn Storage) {
    create_then_validate(store).await;
    bad_credentials_are_indistinguishable(store).await;
    duplicate_login_is_rejected(store).await;
    subject_lookup(store).await;
    insert_select_roundtrip_for_every_kind(store).await;
    binary_payload_roundtrip(store).await;
    owners_are_isolated(store).await;
    update_replaces_payload_and_tech(store).await;
    update_of_foreign_or_missing_record_is_not_found(store).await;
    delete_is_idempotent_and_hides_record(store).await;
    delete_many_removes_only_listed_records(store).await;
    delete_many_tolerates_absent_refs(store).await;
    list_is_grouped_by_kind(store).await;
}

pub async fn create_then_validate(store: &dyn Storage) {
    let login = unique_login("alice");
    store.create_user(&login, "s3cret").await.expect("create");
    store
        .validate_user(&login, "s3cret")
        .await
        .expect("correct password validates");
}

pub async fn bad_credentials_are_indistinguishable(store: &dyn Storage) {
    let login = unique_login("bob");
    store.create_user(&login, "right").await.expect("create");

    let wrong_password = store.validate_user(&login, "wrong").await;
    let unknown_login = store.validate_user(&unique_login("nobody"), "right").await;

    assert!(matches!(wrong_password, Err(StorageError::InvalidCredentials)));
    assert!(matches!(unknown_login, Err(StorageError::InvalidCredentials)));
}

pub async fn duplicate_login_is_rejected(store: &dyn Storage) {
    let login = unique_login("carol");
    store.create_user(&login, "first").await.expect("create");

    let again = store.create_user(&login, "second").await;
    assert!(matches!(again, Err(StorageError::UserAlreadyExists)));

    // The original password still works.
    store.validate_user(&login, "first").await.expect("validate");
}

pub async fn subject_lookup(store: &dyn Storage) {
    let login = unique_login("dave");
    assert!(!store.user_exists(&login).await.expect("exists"));
    assert!(matches!(
        store.subject_id(&login).await,
        Err(StorageError::UserNotFound)
    ));

    let created = store.create_user(&login, "pw").await.expect("create");
    assert!(store.user_exists(&login).await.expect("exists"));
    assert_eq!(store.subject_id(&login).await.expect("lookup"), created);
}

pub async fn insert_select_roundtrip_for_every_kind(store: &dyn Storage) {
    let owner = register(store, "erin").await;
    let payloads = [
        credential("site-login", "site-password"),
        card(),
        text("remember the milk"),
        SecretPayload::Binary {
            data: vec![0, 1, 2, 255],
        },
    ];

    for payload in payloads {
        let kind = payload.kind();
        let meta = tech(&kind.to_string());
        let receipt = store.insert(owner, &payload, &meta).await.expect("insert");
        assert_eq!(receipt.title, meta.title);

        let record = store.select(owner, kind, receipt.id).await.expect("select");
        assert_eq!(record.id, receipt.id);
        assert_eq!(record.payload, payload);
        assert_eq!(record.tech, meta);
    }
}

pub async fn binary_payload_roundtrip(store: &dyn Storage) {
    let owner = register(store, "frank").await;
    let payload = SecretPayload::Binary {
        data: vec![0xDE, 0xAD, 0xBE, 0xEF],
    };
    let receipt = store
        .insert(owner, &payload, &tech("blob"))
        .await
        .expect("insert");

    let record = store
        .select(owner, RecordKind::Binary, receipt.id)
        .await
        .expect("select");
    assert_eq!(record.payload, payload);
}

pub async fn owners_are_isolated(store: &dyn Storage) {
    let alice = register(store, "grace").await;
    let bob = register(store, "heidi").await;

    let receipt = store
        .insert(alice, &text("alice only"), &tech("note"))
        .await
        .expect("insert");

    assert!(matches!(
        store.select(bob, RecordKind::Text, receipt.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(store.list_summaries(bob).await.expect("list").is_empty());

    // Bob deleting it is a silent no-op.
    store
        .delete(bob, RecordKind::Text, receipt.id)
        .await
        .expect("foreign delete");
    store
        .select(alice, RecordKind::Text, receipt.id)
        .await
        .expect("still visible to owner");
}

pub async fn update_replaces_payload_and_tech(store: &dyn Storage) {
    let owner = register(store, "ivan").await;
    let receipt = store
        .insert(owner, &credential("old", "old-pw"), &tech("before"))
        .await
        .expect("insert");

    let updated = store
        .update(owner, receipt.id, &credential("new", "new-pw"), &tech("after"))
        .await
        .expect("update");
    assert_eq!(updated.id, receipt.id);
    assert_eq!(updated.title, "after");

    let record = store
        .select(owner, RecordKind::Credential, receipt.id)
        .await
        .expect("select");
    assert_eq!(record.payload, credential("new", "new-pw"));
    assert_eq!(record.tech, tech("after"));
}

pub async fn update_of_foreign_or_missing_record_is_not_found(store: &dyn Storage) {
    let alice = register(store, "judy").await;
    let bob = register(store, "mallory").await;
    let receipt = store
        .insert(alice, &text("original"), &tech("note"))
        .await
        .expect("insert");

    let foreign = store
        .update(bob, receipt.id, &text("hijacked"), &tech("owned"))
        .await;
    assert!(matches!(foreign, Err(StorageError::NotFound)));

    let missing = store
        .update(alice, receipt.id + 1_000_000, &text("x"), &tech("x"))
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound)));

    let record = store
        .select(alice, RecordKind::Text, receipt.id)
        .await
        .expect("select");
    assert_eq!(record.payload, text("original"));
}

pub async fn delete_is_idempotent_and_hides_record(store: &dyn Storage) {
    let owner = register(store, "niaj").await;
    let receipt = store
        .insert(owner, &card(), &tech("card"))
        .await
        .expect("insert");

    store
        .delete(owner, RecordKind::Card, receipt.id)
        .await
        .expect("first delete");
    store
        .delete(owner, RecordKind::Card, receipt.id)
        .await
        .expect("second delete");

    assert!(matches!(
        store.select(owner, RecordKind::Card, receipt.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        store
            .update(owner, receipt.id, &card(), &tech("revived"))
            .await,
        Err(StorageError::NotFound)
    ));
    assert!(store.list_summaries(owner).await.expect("list").is_empty());
}

pub async fn delete_many_removes_only_listed_records(store: &dyn Storage) {
    let owner = register(store, "olivia").await;
    let keep = store
        .insert(owner, &text("keep"), &tech("keep"))
        .await
        .expect("insert");
    let drop_text = store
        .insert(owner, &text("drop"), &tech("drop"))
        .await
        .expect("insert");
    let drop_card = store
        .insert(owner, &card(), &tech("card"))
        .await
        .expect("insert");

    store
        .delete_many(
            owner,
            &[
                RecordRef {
                    id: drop_text.id,
                    kind: RecordKind::Text,
                },
                RecordRef {
                    id: drop_card.id,
                    kind: RecordKind::Card,
                },
            ],
        )
        .await
        .expect("delete many");

    let remaining = store.list_summaries(owner).await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
    assert_eq!(remaining[0].kind, RecordKind::Text);
}

pub async fn delete_many_tolerates_absent_refs(store: &dyn Storage) {
    let owner = register(store, "peggy").await;
    let other = register(store, "rupert").await;
    let theirs = store
        .insert(other, &text("not yours"), &tech("theirs"))
        .await
        .expect("insert");

    store.delete_many(owner, &[]).await.expect("empty list");
    store
        .delete_many(
            owner,
            &[
                RecordRef {
                    id: theirs.id,
                    kind: RecordKind::Text,
                },
                RecordRef {
                    id: theirs.id + 1_000_000,
                    kind: RecordKind::Binary,
                },
            ],
        )
        .await
        .expect("absent refs are skipped");

    store
        .select(other, RecordKind::Text, theirs.id)
        .await
        .expect("other owner's record untouched");
}

pub async fn list_is_grouped_by_kind(store: &dyn Storage) {
    let owner = register(store, "sybil").await;

    // Insert in reverse kind order; the listing must not follow it.
    store
        .insert(owner, &SecretPayload::Binary { data: vec![7] }, &tech("binary"))
        .await
        .expect("insert");
    store
        .insert(owner, &text("t"), &tech("text"))
        .await
        .expect("insert");
    store
        .insert(owner, &card(), &tech("card"))
        .await
        .expect("insert");
    store
        .insert(owner, &credential("l", "p"), &tech("credential"))
        .await
        .expect("insert");

    let summaries = store.list_summaries(owner).await.expect("list");
    let kinds: Vec<RecordKind> = summaries.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, RecordKind::ALL.to_vec());

    for summary in &summaries {
        assert_eq!(summary.title, summary.kind.to_string());
        assert_eq!(summary.tag, format!("{}-tag", summary.kind));
        assert_eq!(summary.comment, format!("{}-comment", summary.kind));
    }
}
