mod chat;
mod clones;
mod config;
mod db;
mod email;
mod errors;
mod inference;
mod models;
mod routes;
mod state;
mod uploads;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::store::PgMessageStore;
use crate::chat::ChatSessions;
use crate::config::Config;
use crate::db::create_pool;
use crate::email::Mailer;
use crate::inference::ClaudeInference;
use crate::routes::build_router;
use crate::state::AppState;
use crate::uploads::store::{PgFileStore, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Remi API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Gateways, constructed once and injected everywhere
    let messages = Arc::new(PgMessageStore::new(pool.clone()));
    let objects = Arc::new(S3ObjectStore::new(s3, config.s3_bucket.clone()));
    let files = Arc::new(PgFileStore::new(pool.clone()));
    let inference = Arc::new(ClaudeInference::new(config.anthropic_api_key.clone()));
    info!("Inference gateway initialized (model: {})", inference::MODEL);

    let mailer = Mailer::new(config.resend_api_key.clone());

    // Build app state
    let state = AppState {
        db: pool,
        messages,
        objects,
        files,
        inference,
        mailer,
        sessions: ChatSessions::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "remi-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
