//! Per-client admission control over a fixed window that rolls on access.
//!
//! One bucket per client identity. The bucket's window is rotated lazily by
//! the request that finds it expired; no timer drives resets. A separate
//! sweep drops buckets that have been idle for a full extra window.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::errors::ClassifiedError;
use crate::observability::metrics;

/// Bucket key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Counter state for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionBucket {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Epoch millis at which the current window ends.
    pub window_reset_at: u64,
}

/// Shared admission state for all in-flight requests.
pub struct AdmissionController {
    buckets: DashMap<String, AdmissionBucket>,
    window_ms: u64,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            window_ms: config.window_ms,
            max_requests: config.max_requests,
            clock,
        }
    }

    /// Admit or refuse one request from `identity`, consuming a slot on admit.
    ///
    /// The read-check-increment runs under the bucket's shard lock, so two
    /// concurrent requests can never both take the last slot.
    pub fn check_and_consume(&self, identity: &str) -> Decision {
        let now = self.clock.now_millis();
        let window_ms = self.window_ms;

        let mut bucket = self
            .buckets
            .entry(identity.to_owned())
            .or_insert_with(|| AdmissionBucket {
                count: 0,
                window_reset_at: now.saturating_add(window_ms),
            });

        // The reset instant itself still belongs to the old window.
        if now > bucket.window_reset_at {
            bucket.count = 0;
            bucket.window_reset_at = now.saturating_add(window_ms);
        }

        if bucket.count >= self.max_requests {
            return Decision::Deny;
        }

        bucket.count += 1;
        Decision::Allow
    }

    /// Drop buckets idle for a full window past their reset. Returns how many went.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let window_ms = self.window_ms;
        let before = self.buckets.len();

        self.buckets
            .retain(|_, bucket| bucket.window_reset_at.saturating_add(window_ms) >= now);

        let after = self.buckets.len();
        metrics::record_bucket_count(after);
        before.saturating_sub(after)
    }

    /// Snapshot of one client's bucket.
    pub fn bucket(&self, identity: &str) -> Option<AdmissionBucket> {
        self.buckets.get(identity).map(|b| *b)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// State for the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    pub controller: Arc<AdmissionController>,
    pub trust_forwarded_for: bool,
}

/// Work out which bucket a request counts against.
pub fn client_identity(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware function for admission control.
pub async fn rate_limit_middleware(
    State(state): State<AdmissionState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identity(&request, state.trust_forwarded_for);

    match state.controller.check_and_consume(&client) {
        Decision::Allow => {
            metrics::record_admission(true);
            next.run(request).await
        }
        Decision::Deny => {
            tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
            metrics::record_admission(false);
            ClassifiedError::rate_limited().into_response()
        }
    }
}

/// Run `cleanup` every `interval` until shutdown is signalled.
pub fn spawn_sweeper(
    controller: Arc<AdmissionController>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = controller.cleanup();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = controller.len(), "Swept idle admission buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Admission sweeper stopping");
                    break;
                }
            }
        }
    })
}
