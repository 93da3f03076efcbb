//! Integration tests for the pwdm HTTP API.
//!
//! Each test drives the full router in-process with `oneshot`, backed by the
//! in-memory store. No network or database is needed.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use pwdm_core::{SigningKey, TokenService};
use pwdm_server::routes::build_router;
use pwdm_server::state::AppState;
use pwdm_storage::{MemoryStorage, RecordKind};

struct TestApp {
    router: Router,
    tokens: TokenService,
    storage: Arc<MemoryStorage>,
}

fn app_with_ttl(ttl: chrono::Duration) -> TestApp {
    let key = [9u8; 32];
    let storage = Arc::new(MemoryStorage::new());
    let state = Arc::new(AppState::new(
        Arc::clone(&storage) as Arc<dyn pwdm_storage::Storage>,
        TokenService::new(SigningKey::from_bytes(key), ttl),
    ));
    TestApp {
        router: build_router(state),
        // Same key as the server, so tests can mint tokens it accepts.
        tokens: TokenService::new(SigningKey::from_bytes(key), ttl),
        storage,
    }
}

fn app() -> TestApp {
    app_with_ttl(chrono::Duration::hours(1))
}

async fn call(router: &Router, method: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/v1/{method}"))
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(router: &Router, login: &str) -> String {
    let (status, body) = call(router, "Create", None, json!({"login": login, "password": "pw"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_owned()
}

// ── Identity bootstrap ───────────────────────────────────────────────

#[tokio::test]
async fn create_then_enter_issue_working_tokens() {
    let app = app();
    let created = register(&app.router, "alice").await;

    let (status, body) = call(
        &app.router,
        "Enter",
        None,
        json!({"login": "alice", "password": "pw"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entered = body["token"].as_str().unwrap();

    let a = app.tokens.verify(&created).unwrap();
    let b = app.tokens.verify(entered).unwrap();
    assert_eq!(a.subject(), b.subject());
}

#[tokio::test]
async fn duplicate_login_is_conflict() {
    let app = app();
    register(&app.router, "bob").await;

    let (status, body) = call(
        &app.router,
        "Create",
        None,
        json!({"login": "bob", "password": "other"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn wrong_password_and_unknown_login_look_identical() {
    let app = app();
    register(&app.router, "carol").await;

    let wrong = call(
        &app.router,
        "Enter",
        None,
        json!({"login": "carol", "password": "nope"}),
    )
    .await;
    let unknown = call(
        &app.router,
        "Enter",
        None,
        json!({"login": "nobody", "password": "pw"}),
    )
    .await;

    assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
    assert_eq!(wrong.1["message"], "login or password incorrect");
}

// ── Auth middleware ──────────────────────────────────────────────────

#[tokio::test]
async fn authenticated_methods_require_a_token() {
    let app = app();
    for method in ["InsertText", "GetText", "UpdateText", "DeleteItem", "DeleteAll", "ListInfo"] {
        let (status, body) = call(&app.router, method, None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method}");
        assert_eq!(body["error"], "unauthenticated");
        assert_eq!(body["message"], "missing token");
    }
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_rejected() {
    let app = app_with_ttl(chrono::Duration::seconds(-10));
    let expired = register(&app.router, "dave").await;

    for token in ["garbage", expired.as_str()] {
        let (status, body) = call(&app.router, "ListInfo", Some(token), json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid token");
    }
}

#[tokio::test]
async fn token_from_another_process_key_is_rejected() {
    let app = app();
    let foreign = TokenService::new(SigningKey::generate().unwrap(), chrono::Duration::hours(1));
    let token = foreign.issue(pwdm_storage::SubjectId::generate()).unwrap();

    let (status, _) = call(&app.router, "ListInfo", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn smuggled_identity_extension_is_replaced() {
    let app = app();
    let alice = register(&app.router, "erin").await;
    let bob = register(&app.router, "frank").await;

    call(
        &app.router,
        "InsertText",
        Some(&alice),
        json!({"body": "alice secret", "title": "mine"}),
    )
    .await;

    // Bob's request arrives already carrying Alice's identity.
    let alice_identity = app.tokens.verify(&alice).unwrap();
    let mut request = Request::builder()
        .method("POST")
        .uri("/v1/ListInfo")
        .header("token", &bob)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(alice_identity);

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["items"], json!([]));

    // Without a token the smuggled identity does not get the call through.
    let mut request = Request::builder()
        .method("POST")
        .uri("/v1/ListInfo")
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(alice_identity);
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ── Records ──────────────────────────────────────────────────────────

#[tokio::test]
async fn credential_insert_get_update_roundtrip() {
    let app = app();
    let token = register(&app.router, "grace").await;

    let (status, inserted) = call(
        &app.router,
        "InsertCredential",
        Some(&token),
        json!({"login": "me", "password": "pw1", "title": "Site1", "tag": "web", "type": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inserted["title"], "Site1");
    let id = inserted["id"].as_i64().unwrap();

    let (status, record) = call(&app.router, "GetCredential", Some(&token), json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["login"], "me");
    assert_eq!(record["password"], "pw1");
    assert_eq!(record["tag"], "web");
    assert_eq!(record["type"], 1);

    let (status, updated) = call(
        &app.router,
        "UpdateCredential",
        Some(&token),
        json!({"id": id, "login": "me", "password": "pw2", "title": "Site1 renamed"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated, json!({"id": id, "title": "Site1 renamed"}));

    let (_, record) = call(&app.router, "GetCredential", Some(&token), json!({"id": id})).await;
    assert_eq!(record["password"], "pw2");
}

#[tokio::test]
async fn records_are_isolated_between_owners() {
    let app = app();
    let alice = register(&app.router, "heidi").await;
    let bob = register(&app.router, "ivan").await;

    let (_, inserted) = call(
        &app.router,
        "InsertCredential",
        Some(&alice),
        json!({"login": "a", "password": "b", "title": "Site1"}),
    )
    .await;
    let id = inserted["id"].as_i64().unwrap();

    let (status, body) = call(&app.router, "GetCredential", Some(&bob), json!({"id": id})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.to_string().contains("Site1"));

    let (status, _) = call(
        &app.router,
        "UpdateCredential",
        Some(&bob),
        json!({"id": id, "login": "x", "password": "y", "title": "pwned"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn binary_payload_roundtrips_through_base64() {
    let app = app();
    let token = register(&app.router, "judy").await;

    let (status, inserted) = call(
        &app.router,
        "InsertBinary",
        Some(&token),
        json!({"data": "3q2+7w==", "title": "blob"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = inserted["id"].as_i64().unwrap();

    let (_, record) = call(&app.router, "GetBinary", Some(&token), json!({"id": id})).await;
    assert_eq!(record["data"], "3q2+7w==");
}

#[tokio::test]
async fn corrupted_row_is_a_generic_internal_error() {
    let app = app();
    let token = register(&app.router, "victor").await;

    let (_, inserted) = call(
        &app.router,
        "InsertBinary",
        Some(&token),
        json!({"data": "3q2+7w==", "title": "blob"}),
    )
    .await;
    let id = inserted["id"].as_i64().unwrap();
    assert!(
        app.storage
            .corrupt_columns(RecordKind::Binary, id, vec!["zz-not-hex".to_owned()])
            .await
    );

    let (status, body) = call(&app.router, "GetBinary", Some(&token), json!({"id": id})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "internal_error", "message": "internal server error"})
    );
}

#[tokio::test]
async fn mismatched_type_code_is_bad_request() {
    let app = app();
    let token = register(&app.router, "mallory").await;

    let (status, body) = call(
        &app.router,
        "InsertCard",
        Some(&token),
        json!({"number": "4111", "title": "card", "type": 3}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app();
    let token = register(&app.router, "niaj").await;

    let (status, body) = call(&app.router, "GetText", Some(&token), json!({"id": "seven"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn list_info_returns_one_summary_per_kind_in_kind_order() {
    let app = app();
    let token = register(&app.router, "olivia").await;

    for (method, body) in [
        ("InsertBinary", json!({"data": "AA==", "title": "b"})),
        ("InsertText", json!({"body": "t", "title": "t"})),
        ("InsertCard", json!({"number": "1", "title": "c"})),
        ("InsertCredential", json!({"login": "l", "password": "p", "title": "l"})),
    ] {
        let (status, _) = call(&app.router, method, Some(&token), body).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app.router, "ListInfo", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    let types: Vec<i64> = items.iter().map(|i| i["type"].as_i64().unwrap()).collect();
    let titles: Vec<&str> = items.iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(types, vec![1, 2, 3, 4]);
    assert_eq!(titles, vec!["l", "c", "t", "b"]);
}

// ── Deletion ─────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_item_is_idempotent() {
    let app = app();
    let token = register(&app.router, "peggy").await;
    let (_, inserted) = call(
        &app.router,
        "InsertText",
        Some(&token),
        json!({"body": "bye", "title": "note"}),
    )
    .await;
    let id = inserted["id"].as_i64().unwrap();

    for _ in 0..2 {
        let (status, _) = call(
            &app.router,
            "DeleteItem",
            Some(&token),
            json!({"id": id, "type": 3}),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _) = call(&app.router, "GetText", Some(&token), json!({"id": id})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_all_removes_listed_records_only() {
    let app = app();
    let token = register(&app.router, "rupert").await;

    let mut ids = Vec::new();
    for title in ["one", "two", "three"] {
        let (_, inserted) = call(
            &app.router,
            "InsertText",
            Some(&token),
            json!({"body": title, "title": title}),
        )
        .await;
        ids.push(inserted["id"].as_i64().unwrap());
    }

    let (status, _) = call(
        &app.router,
        "DeleteAll",
        Some(&token),
        json!({"items": [{"id": ids[0], "type": 3}, {"id": ids[2], "type": 3}, {"id": 999, "type": 4}]}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&app.router, "ListInfo", Some(&token), json!({})).await;
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["two"]);
}

#[tokio::test]
async fn delete_all_with_unknown_type_deletes_nothing() {
    let app = app();
    let token = register(&app.router, "sybil").await;
    let (_, inserted) = call(
        &app.router,
        "InsertText",
        Some(&token),
        json!({"body": "keep", "title": "keep"}),
    )
    .await;
    let id = inserted["id"].as_i64().unwrap();

    let (status, _) = call(
        &app.router,
        "DeleteAll",
        Some(&token),
        json!({"items": [{"id": id, "type": 3}, {"id": 1, "type": 9}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app.router, "GetText", Some(&token), json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_are_marked_uncacheable() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/Create")
        .header("content-type", "application/json")
        .body(Body::from(json!({"login": "trent", "password": "pw"}).to_string()))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["cache-control"], "no-store");
}
