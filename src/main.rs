use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use referral_core::constants::DEFAULT_DATA_DIR;
use referral_core::{token_ttl_from_env_value, CoreConfig, RunMode, Storage};

/// Main entry point for the referral tracking service
///
/// Opens the document store and serves the REST API until Ctrl-C.
///
/// # Environment Variables
/// - `REFERRALS_REST_ADDR`: REST server address (default: "0.0.0.0:4000")
/// - `REFERRALS_DATA_DIR`: Directory for document storage (default: "referral_data")
/// - `JWT_SECRET`: HMAC secret for bearer tokens, at least 32 bytes (required)
/// - `JWT_EXPIRES_IN`: Token lifetime, e.g. "3600", "12h" or "7d" (default: 24h)
/// - `CORS_ORIGIN`: Allowed browser origin (default: "http://localhost:3000")
/// - `REFERRALS_ENV`: "development" exposes error details in failure bodies
///
/// # Returns
/// * `Ok(())` - If the server shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails to start
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in default_log_directives() {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("REFERRALS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".into());
    let data_dir = std::env::var("REFERRALS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
    let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let ttl = token_ttl_from_env_value(std::env::var("JWT_EXPIRES_IN").ok())?;
    let run_mode = RunMode::from_env_value(std::env::var("REFERRALS_ENV").ok().as_deref());
    let cors_origin =
        std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".into());

    let cfg = CoreConfig::new(data_dir, secret, ttl, run_mode)?;
    let storage = Storage::open(cfg.data_dir())?;
    let state = AppState::new(&cfg, storage)?;

    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS_ORIGIN '{cors_origin}'"))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = router(state).layer(cors);

    tracing::info!("++ Starting referrals REST on {} ({:?} mode)", rest_addr, run_mode);

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("failed to bind {rest_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Referrals REST stopped");
    Ok(())
}

/// `info` for this binary and the workspace crates it drives.
fn default_log_directives() -> [String; 3] {
    [
        format!("{}=info", env!("CARGO_CRATE_NAME")),
        "referral_core=info".to_string(),
        "api_rest=info".to_string(),
    ]
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
}
