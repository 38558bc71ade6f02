//! Request gate server and token tooling.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                       REQUEST GATE                        │
//!   request       │  ┌───────────┐   ┌──────────────┐   ┌────────────────┐    │
//!   ──────────────┼─▶│ admission │──▶│    auth      │──▶│    handler     │    │
//!                 │  │ (per IP)  │   │ (bearer JWT) │   │  (business)    │    │
//!                 │  └─────┬─────┘   └──────┬───────┘   └───────┬────────┘    │
//!                 │        │ 429            │ 401               │ Failure     │
//!                 │        ▼                ▼                   ▼             │
//!   response      │  ┌────────────────────────────────────────────────────┐   │
//!   ◀─────────────┼──│      error classification → JSON envelope          │   │
//!                 │  └────────────────────────────────────────────────────┘   │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;

use request_gate::auth::{Claims, TokenService};
use request_gate::clock::SystemClock;
use request_gate::config::{self, Environment, GateConfig, Overrides};
use request_gate::http::routes;
use request_gate::observability;
use request_gate::{GateServer, Pipeline, Shutdown};

#[derive(Parser)]
#[command(name = "request-gate", version)]
#[command(about = "Admission control, bearer authentication and error classification for API servers", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Token signing secret
    #[arg(long, env = "GATE_JWT_SECRET", global = true, hide_env_values = true)]
    jwt_secret: Option<String>,

    /// development or production
    #[arg(long, env = "GATE_ENV", global = true)]
    environment: Option<Environment>,

    /// Listener address, e.g. 0.0.0.0:3000
    #[arg(long, env = "GATE_BIND_ADDRESS", global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Issue a token signed with the configured secret
    IssueToken {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: Option<String>,
        /// Extra claim as name=value; JSON values are kept typed
        #[arg(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, Value)>,
    },
    /// Verify a token against the configured secret
    VerifyToken { token: String },
    /// Print a token's payload WITHOUT verifying it
    InspectToken { token: String },
}

fn parse_claim(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn load_config(cli: &Cli) -> Result<GateConfig, config::ConfigError> {
    let overrides = Overrides {
        jwt_secret: cli.jwt_secret.clone(),
        environment: cli.environment,
        bind_address: cli.bind.clone(),
    };
    config::load(cli.config.as_deref(), &overrides)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        None | Some(Commands::Serve) => serve(load_config(&cli)?).await,
        Some(Commands::IssueToken {
            subject,
            email,
            claims,
        }) => {
            let config = load_config(&cli)?;
            let tokens = TokenService::new(&config.auth, Arc::new(SystemClock))?;
            let mut payload = Claims::new(subject.clone());
            if let Some(email) = email {
                payload = payload.with_email(email.clone());
            }
            for (name, value) in claims {
                payload = payload.with_claim(name.clone(), value.clone());
            }
            println!("{}", tokens.issue(&payload)?);
            Ok(())
        }
        Some(Commands::VerifyToken { token }) => {
            let config = load_config(&cli)?;
            let tokens = TokenService::new(&config.auth, Arc::new(SystemClock))?;
            let claims = tokens.verify(token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
        Some(Commands::InspectToken { token }) => {
            let decoded = TokenService::decode(token).ok_or("token is not structurally valid")?;
            eprintln!("WARNING: signature and expiry NOT checked");
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "claims": decoded.claims,
                    "iat": decoded.issued_at,
                    "exp": decoded.expires_at,
                    "jti": decoded.token_id,
                }))?
            );
            Ok(())
        }
    }
}

async fn serve(config: GateConfig) -> Result<(), Box<dyn std::error::Error>> {
    observability::logging::init(&config.observability)?;

    tracing::info!("request-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        token_ttl_secs = config.auth.token_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pipeline = Pipeline::new(&config, Arc::new(SystemClock))?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = GateServer::new(
        config,
        pipeline,
        routes::public_routes(),
        routes::protected_routes(),
    );
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
