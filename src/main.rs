//! Co-writing study server
//!
//! Walks participants through a timed creative-writing experiment with an
//! AI brainstorming partner whose behavior depends on a randomly assigned
//! condition, and gives researchers override and export controls.

mod api;
mod auth;
mod conditions;
mod config;
mod export;
mod llm;
mod relay;
mod runtime;
mod state_machine;
mod survey;

use api::{create_router, AppState};
use auth::AdminCredential;
use conditions::{ConditionCatalog, ThreadRngSource};
use config::{RelayBackendConfig, StudyConfig};
use llm::{LoggingService, OpenAIAssistants, OpenAIService};
use relay::{AssistantDirectory, ChatBackend, ChatRelay, CompletionBackend, PollPolicy, ThreadedBackend};
use runtime::StudyRuntime;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cowrite_study=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; nothing is bound until it is valid
    let config = StudyConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    tracing::info!(config = ?config, "Configuration loaded");

    let backend = build_backend(&config)?;
    let catalog = ConditionCatalog::standard();
    tracing::info!(
        backend = backend.name(),
        conditions = catalog.len(),
        "Chat relay initialized"
    );

    // Create application state
    let runtime = StudyRuntime::new(
        catalog,
        Arc::new(ThreadRngSource),
        ChatRelay::new(backend),
        config.survey_url.clone(),
    );
    let state = AppState::new(runtime, AdminCredential::new(&config.admin_password));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Co-writing study server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_backend(config: &StudyConfig) -> Result<Arc<dyn ChatBackend>, llm::LlmError> {
    let backend: Arc<dyn ChatBackend> = match &config.backend {
        RelayBackendConfig::Completion { model } => {
            let service = OpenAIService::new(
                config.openai_api_key.clone(),
                model.clone(),
                &config.openai_base_url,
            )?;
            Arc::new(CompletionBackend::new(Arc::new(LoggingService::new(
                Arc::new(service),
            ))))
        }
        RelayBackendConfig::Assistants {
            strategic_assistant,
            baseline_assistant,
        } => {
            let api = OpenAIAssistants::new(config.openai_api_key.clone(), &config.openai_base_url)?;
            Arc::new(ThreadedBackend::new(
                Arc::new(api),
                AssistantDirectory::new(strategic_assistant.as_str(), baseline_assistant.as_str()),
                PollPolicy::default().with_max_wait(config.poll_max_wait),
            ))
        }
    };
    Ok(backend)
}
