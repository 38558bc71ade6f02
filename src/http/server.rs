//! HTTP server setup.
//!
//! # Responsibilities
//! - Compose the gated router (admission, authentication, classification)
//! - Wire request ID and trace layers around it
//! - Run the admission sweeper for the lifetime of the server
//! - Serve with peer addresses and graceful shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GateConfig;
use crate::lifecycle::Shutdown;
use crate::pipeline::Pipeline;
use crate::security::rate_limit::spawn_sweeper;

/// HTTP server for the gated API.
pub struct GateServer {
    router: Router,
    pipeline: Pipeline,
    config: GateConfig,
}

impl GateServer {
    /// Create a server whose `public` and `protected` routes sit behind the pipeline.
    pub fn new(config: GateConfig, pipeline: Pipeline, public: Router, protected: Router) -> Self {
        let router = Self::build_router(&pipeline, public, protected);
        Self {
            router,
            pipeline,
            config,
        }
    }

    fn build_router(pipeline: &Pipeline, public: Router, protected: Router) -> Router {
        pipeline
            .compose(public, protected)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            window_ms = self.config.rate_limit.window_ms,
            max_requests = self.config.rate_limit.max_requests,
            environment = ?self.config.environment,
            "HTTP server starting"
        );

        let sweeper = spawn_sweeper(
            self.pipeline.admission().clone(),
            Duration::from_millis(self.config.rate_limit.cleanup_interval_ms),
            shutdown.subscribe(),
        );

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        sweeper.abort();
        result?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
