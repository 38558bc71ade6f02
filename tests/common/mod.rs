//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use request_gate::accounts::{NewUser, UserRecord, UserStore};
use request_gate::clock::ManualClock;
use request_gate::config::{Environment, GateConfig};
use request_gate::errors::{Failure, FieldErrors};
use request_gate::Pipeline;

pub const T0: u64 = 1_700_000_000_000;

pub fn test_config(environment: Environment, max_requests: u32) -> GateConfig {
    let mut config = GateConfig::default();
    config.environment = environment;
    config.auth.jwt_secret = "integration-secret".into();
    config.auth.token_ttl_secs = 3600;
    config.rate_limit.window_ms = 60_000;
    config.rate_limit.max_requests = max_requests;
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

pub fn pipeline(config: &GateConfig) -> (Pipeline, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    (Pipeline::new(config, clock.clone()).unwrap(), clock)
}

/// Send a request from `peer` through `app` and return status + JSON body.
pub async fn send(app: &Router, peer: &str, mut request: Request<Body>) -> (u16, Value) {
    request
        .extensions_mut()
        .insert(ConnectInfo(format!("{peer}:40000").parse::<std::net::SocketAddr>().unwrap()));
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

pub fn get_with_auth(path: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// In-memory user store. Passwords are compared as given; tests only.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, (UserRecord, String)>>,
    next_id: AtomicU64,
    /// Fail the next `create` with this failure kind.
    pub fail_create: Mutex<Option<&'static str>>,
}

impl MemoryUserStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, Failure> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, Failure> {
        Ok(self.users.lock().unwrap().get(id).map(|(u, _)| u.clone()))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, Failure> {
        match self.fail_create.lock().unwrap().take() {
            Some("duplicate") => {
                return Err(Failure::DuplicateKey {
                    key: "email".into(),
                })
            }
            Some("validation") => {
                let mut fields = FieldErrors::new();
                fields.insert("name".into(), "Name is too long".into());
                fields.insert("email".into(), "Email is too long".into());
                return Err(Failure::FieldValidation(fields));
            }
            Some(other) => {
                return Err(Failure::unexpected(format!(
                    "storage unavailable: {other}"
                )))
            }
            None => {}
        }

        let id = format!("u{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = UserRecord {
            id: id.clone(),
            email: user.email,
            name: user.name,
        };
        self.users
            .lock()
            .unwrap()
            .insert(id, (record.clone(), user.password));
        Ok(record)
    }

    async fn verify_password(&self, user: &UserRecord, password: &str) -> Result<bool, Failure> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user.id)
            .is_some_and(|(_, stored)| stored == password))
    }
}
