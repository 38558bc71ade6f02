//! End-to-end behaviour of the gated router, driven in-process.

use std::sync::Arc;

use axum::{routing, Router};
use serde_json::json;

use request_gate::accounts::{self, AuthService};
use request_gate::auth::Claims;
use request_gate::clock::ManualClock;
use request_gate::config::Environment;
use request_gate::errors::{Failure, HandlerError};
use request_gate::http::{routes, ApiResponse};
use request_gate::Pipeline;

mod common;
use common::*;

async fn duplicate() -> Result<ApiResponse, HandlerError> {
    Err(Failure::DuplicateKey { key: "sku".into() }.into())
}

async fn unexpected() -> Result<ApiResponse, HandlerError> {
    Err(Failure::unexpected("disk quota exceeded on /var/lib/tasks").into())
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

fn app(pipeline: &Pipeline, store: Arc<MemoryUserStore>) -> Router {
    let service = Arc::new(AuthService::new(store, pipeline.tokens().clone()));

    let public = routes::public_routes()
        .merge(accounts::public_routes(service.clone()))
        .route("/fail/duplicate", routing::get(duplicate))
        .route("/fail/unexpected", routing::get(unexpected))
        .route("/fail/panic", routing::get(explode));
    let protected = routes::protected_routes().merge(accounts::protected_routes(service));

    pipeline.compose(public, protected)
}

type Harness = (Router, Pipeline, Arc<MemoryUserStore>, Arc<ManualClock>);

fn setup(environment: Environment, max_requests: u32) -> Harness {
    let config = test_config(environment, max_requests);
    let (pipeline, clock) = pipeline(&config);
    let store = MemoryUserStore::new();
    (app(&pipeline, store.clone()), pipeline, store, clock)
}

#[tokio::test]
async fn test_admission_allows_max_then_denies() {
    let (app, _, _, _) = setup(Environment::Production, 3);

    for _ in 0..3 {
        let (status, body) = send(&app, "10.1.1.1", get("/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
    }

    let (status, body) = send(&app, "10.1.1.1", get("/health")).await;
    assert_eq!(status, 429);
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "Too many requests. Please try again later.",
            "statusCode": 429
        })
    );

    // Another client has its own bucket.
    let (status, _) = send(&app, "10.1.1.2", get("/health")).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_admission_window_rolls_with_clock() {
    let (app, _, _, clock) = setup(Environment::Production, 1);

    assert_eq!(send(&app, "10.2.0.1", get("/health")).await.0, 200);
    assert_eq!(send(&app, "10.2.0.1", get("/health")).await.0, 429);

    clock.advance(60_001);
    assert_eq!(send(&app, "10.2.0.1", get("/health")).await.0, 200);
}

#[tokio::test]
async fn test_admission_runs_before_authentication() {
    let (app, _, _, _) = setup(Environment::Production, 1);

    let (status, _) = send(&app, "10.3.0.1", get("/whoami")).await;
    assert_eq!(status, 401);

    // The slot was spent; the next request is refused before any token check.
    let (status, body) = send(&app, "10.3.0.1", get("/whoami")).await;
    assert_eq!(status, 429);
    assert_eq!(body["statusCode"], 429);
}

#[tokio::test]
async fn test_missing_or_foreign_scheme_is_no_token() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let expected = json!({
        "success": false,
        "message": "No token provided",
        "statusCode": 401
    });

    let (status, body) = send(&app, "10.4.0.1", get("/whoami")).await;
    assert_eq!((status, body), (401, expected.clone()));

    let (status, body) = send(&app, "10.4.0.1", get_with_auth("/whoami", "Basic xyz")).await;
    assert_eq!((status, body), (401, expected.clone()));

    let (status, body) = send(&app, "10.4.0.1", get_with_auth("/whoami", "bearer abc")).await;
    assert_eq!((status, body), (401, expected));
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let (app, pipeline, _, _) = setup(Environment::Production, 100);
    let token = pipeline
        .tokens()
        .issue(&Claims::new("user-42").with_email("grace@example.com"))
        .unwrap();

    let (status, body) = send(&app, "10.5.0.1", get_with_auth("/whoami", &format!("Bearer {token}"))).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["sub"], "user-42");
    assert_eq!(body["data"]["email"], "grace@example.com");
}

#[tokio::test]
async fn test_invalid_tokens_are_indistinguishable() {
    let (app, pipeline, _, clock) = setup(Environment::Production, 100);
    let token = pipeline.tokens().issue(&Claims::new("user-1")).unwrap();

    let mut tampered = token.clone().into_bytes();
    tampered[10] = if tampered[10] == b'A' { b'z' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let (_, malformed) = send(&app, "10.6.0.1", get_with_auth("/whoami", "Bearer garbage")).await;
    let (_, forged) = send(&app, "10.6.0.1", get_with_auth("/whoami", &format!("Bearer {tampered}"))).await;
    clock.advance(3_600_000);
    let (status, expired) = send(&app, "10.6.0.1", get_with_auth("/whoami", &format!("Bearer {token}"))).await;

    assert_eq!(status, 401);
    assert_eq!(
        expired,
        json!({
            "success": false,
            "message": "Invalid or expired token",
            "statusCode": 401
        })
    );
    assert_eq!(malformed, forged);
    assert_eq!(forged, expired);
}

#[tokio::test]
async fn test_duplicate_failure_is_conflict() {
    let (app, _, _, _) = setup(Environment::Development, 100);
    let (status, body) = send(&app, "10.7.0.1", get("/fail/duplicate")).await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], "Duplicate entry found");
    assert_eq!(body["statusCode"], 409);
}

#[tokio::test]
async fn test_unexpected_failure_hidden_in_production() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let (status, body) = send(&app, "10.8.0.1", get("/fail/unexpected")).await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "Internal server error",
            "statusCode": 500
        })
    );
}

#[tokio::test]
async fn test_unexpected_failure_shown_in_development() {
    let (app, _, _, _) = setup(Environment::Development, 100);
    let (status, body) = send(&app, "10.9.0.1", get("/fail/unexpected")).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "disk quota exceeded on /var/lib/tasks");
}

#[tokio::test]
async fn test_panic_becomes_internal_envelope() {
    let (app, _, _, _) = setup(Environment::Development, 100);
    let (status, body) = send(&app, "10.10.0.1", get("/fail/panic")).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_route_is_not_found_envelope() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let (status, body) = send(&app, "10.11.0.1", get("/nowhere")).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Resource not found");
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn test_wrong_method_is_envelope() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let expected = json!({
        "success": false,
        "message": "Method not allowed",
        "statusCode": 405
    });

    let (status, body) = send(&app, "10.11.0.2", post_json("/health", json!({}))).await;
    assert_eq!((status, body), (405, expected.clone()));

    let (status, body) = send(&app, "10.11.0.2", get("/auth/register")).await;
    assert_eq!((status, body), (405, expected));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let peer = "10.12.0.1";

    let (status, body) = send(
        &app,
        peer,
        post_json(
            "/auth/register",
            json!({"email": "ada@example.com", "password": "engine1", "name": " <Ada> "}),
        ),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["name"], "Ada");
    assert!(body["data"]["user"].get("password").is_none());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, peer, get_with_auth("/auth/me", &format!("Bearer {token}"))).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], "ada@example.com");

    let (status, body) = send(
        &app,
        peer,
        post_json("/auth/login", json!({"email": "ada@example.com", "password": "engine1"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Login successful");
    assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn test_register_reports_every_bad_field() {
    let (app, _, _, _) = setup(Environment::Production, 100);

    let (status, body) = send(&app, "10.13.0.1", post_json("/auth/register", json!({"email": "x@y.io"}))).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"], json!({"missing": ["password", "name"]}));

    let (status, body) = send(
        &app,
        "10.13.0.1",
        post_json("/auth/register", json!({"email": "bad", "password": "short", "name": "A"})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(
        body["errors"],
        json!({
            "email": "Invalid email format",
            "password": "Password must be at least 6 characters with letter and number"
        })
    );
}

#[tokio::test]
async fn test_register_existing_email_conflicts() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let request = || post_json("/auth/register", json!({"email": "b@c.de", "password": "abc123", "name": "B"}));

    assert_eq!(send(&app, "10.14.0.1", request()).await.0, 201);
    let (status, body) = send(&app, "10.14.0.1", request()).await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_store_failures_are_classified() {
    let (app, _, store, _) = setup(Environment::Production, 100);
    let request = |email: &str| post_json("/auth/register", json!({"email": email, "password": "abc123", "name": "C"}));

    *store.fail_create.lock().unwrap() = Some("duplicate");
    let (status, body) = send(&app, "10.15.0.1", request("c1@d.io")).await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], "Duplicate entry found");

    *store.fail_create.lock().unwrap() = Some("validation");
    let (status, body) = send(&app, "10.15.0.1", request("c2@d.io")).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"].as_object().unwrap().len(), 2);

    *store.fail_create.lock().unwrap() = Some("offline");
    let (status, body) = send(&app, "10.15.0.1", request("c3@d.io")).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let peer = "10.16.0.1";
    send(
        &app,
        peer,
        post_json("/auth/register", json!({"email": "d@e.fr", "password": "abc123", "name": "D"})),
    )
    .await;

    let (s1, wrong_password) = send(&app, peer, post_json("/auth/login", json!({"email": "d@e.fr", "password": "nope12"}))).await;
    let (s2, unknown_user) = send(&app, peer, post_json("/auth/login", json!({"email": "z@e.fr", "password": "abc123"}))).await;

    assert_eq!((s1, s2), (401, 401));
    assert_eq!(wrong_password["message"], "Invalid email or password");
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn test_me_for_deleted_user() {
    let (app, pipeline, _, _) = setup(Environment::Production, 100);
    let token = pipeline.tokens().issue(&Claims::new("ghost")).unwrap();

    let (status, body) = send(&app, "10.17.0.1", get_with_auth("/auth/me", &format!("Bearer {token}"))).await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, "10.18.0.1", request).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation failed");
    assert!(body["errors"]["body"].is_string());
}

#[tokio::test]
async fn test_success_envelope_shape() {
    let (app, _, _, _) = setup(Environment::Production, 100);
    let (_, body) = send(&app, "10.19.0.1", get("/health")).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Success");
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["status"], "operational");
    assert!(body.get("errors").is_none());
    assert!(body["data"]["version"].is_string());
}
