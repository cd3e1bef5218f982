//! Narrative API Server
//!
//! Serves the questionnaire configuration and turns submitted answers into
//! a readable document. Provides REST API endpoints for:
//!
//! - Configuration publishing, history and export/import
//! - Narrative template generation and invalidation
//! - Document preview and plain-text export
//!
//! ## Storage
//!
//! Configurations and generated templates are kept in SQLite. Without
//! `--database-url` the database lives under the platform data directory.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use narrative_engine::config::{DEFAULT_GENERATION_TIMEOUT_MS, DEFAULT_PUBLISH_RETRIES};
use narrative_engine::{EngineConfig, GenerationConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;
mod store;
#[cfg(test)]
mod tests;

use state::AppState;

/// Command-line arguments for the narrative server
#[derive(Parser, Debug)]
#[command(name = "narrative-api")]
#[command(about = "Questionnaire configuration and document rendering server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Keep configurations and templates in memory; nothing is persisted
    #[arg(long)]
    in_memory: bool,

    /// Hosted text-generation endpoint; narrative templates use the static
    /// fallback when unset
    #[arg(long, env = "AI_ENDPOINT")]
    ai_endpoint: Option<String>,

    /// Bearer token for the text-generation endpoint
    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    ai_api_key: Option<String>,

    /// Generation timeout in milliseconds
    #[arg(long, env = "GENERATION_TIMEOUT_MS", default_value_t = DEFAULT_GENERATION_TIMEOUT_MS)]
    generation_timeout_ms: u64,

    /// Attempts per publish when concurrent writers conflict
    #[arg(long, env = "PUBLISH_RETRIES", default_value_t = DEFAULT_PUBLISH_RETRIES)]
    publish_retries: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let mut generation = match &self.ai_endpoint {
            Some(endpoint) => {
                GenerationConfig::with_endpoint(endpoint.clone(), self.ai_api_key.clone())
            }
            None => GenerationConfig::default(),
        };
        generation.timeout_ms = self.generation_timeout_ms;

        EngineConfig {
            generation,
            publish_retries: self.publish_retries,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(log_level.into())
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting narrative server on {}:{}", args.host, args.port);

    let config = args.engine_config();
    let ai_enabled = config.generation.ai_available();
    let state = if args.in_memory {
        info!("Using in-memory storage");
        AppState::in_memory(config)
    } else {
        AppState::new(args.database_url.clone(), config).await?
    };
    let state = Arc::new(state);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!(
        "AI generation: {}",
        if ai_enabled { "enabled" } else { "fallback only" }
    );
    info!("Generation timeout: {}ms", args.generation_timeout_ms);

    axum::serve(listener, app).await?;

    Ok(())
}
