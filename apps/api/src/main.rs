mod config;
mod db;
mod document;
mod errors;
mod llm_client;
mod models;
mod routes;
mod service;
mod state;
mod workflow;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::document::render::{LatexRenderer, MarkupConverter};
use crate::llm_client::search::{SearchTool, TavilySearch};
use crate::llm_client::{LlmClient, StructuredLlm};
use crate::routes::build_router;
use crate::service::AssistantService;
use crate::state::AppState;
use crate::workflow::classifier::LlmIntentClassifier;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::router::Router as IntentRouter;
use crate::workflow::store::PgSessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume agent API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL session store
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let store = Arc::new(PgSessionStore::new(db));

    // Initialize LLM client
    let client = LlmClient::new(config.anthropic_api_key.clone(), &config.anthropic_base_url)?;
    let llm = StructuredLlm::new(Arc::new(client), config.llm_timeout);
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.llm_timeout.as_secs()
    );

    // Optional web search for company research
    let search = config.tavily_api_key.clone().map(|key| {
        let tool: Arc<dyn SearchTool> = Arc::new(TavilySearch::new(key, &config.tavily_base_url));
        (tool, config.search_timeout)
    });
    if search.is_none() {
        info!("TAVILY_API_KEY not set; company research runs without web search");
    }

    // Build the routing table and engine
    let engine = WorkflowEngine::new(
        Arc::new(LlmIntentClassifier::new(llm.clone())),
        IntentRouter::standard(llm.clone(), search),
        store,
    )
    .with_fallback(config.classification_fallback)
    .with_retention(config.retention);
    info!(
        "Workflow engine ready (classification fallback: {:?}, retention: {} messages / {} versions)",
        config.classification_fallback, config.retention.max_messages, config.retention.max_versions
    );

    let renderer = LatexRenderer::new(config.latex_program.clone());
    if !renderer.is_available().await {
        warn!(
            "{} not found; PDF downloads will fail until a LaTeX distribution is installed",
            config.latex_program
        );
    }

    // Build app state
    let state = AppState {
        service: Arc::new(AssistantService::new(
            engine,
            MarkupConverter::new(llm),
            renderer,
        )),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS restricted to the configured frontend origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
