//! Helpdesk Fabric server binary.
//!
//! Wires configuration into the adapters, starts the message router and
//! serves the websocket, webhook and operator routes until Ctrl-C.

use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use helpdesk_fabric::adapters::http::{operator_router, OperatorAppState};
use helpdesk_fabric::adapters::platforms::{webhook_router, WebhookState};
use helpdesk_fabric::adapters::websocket::{websocket_router, WebSocketState};
use helpdesk_fabric::adapters::{
    ConnectionHub, HttpKnowledgeClient, HttpKnowledgeConfig, InMemoryCircuitBreaker,
    InMemoryKnowledgeIndex, InMemoryMessageArchive, MockAIProvider, OpenAIConfig,
    OpenAIProvider, TelegramAdapter, WebAdapter, WebhookChatAdapter,
};
use helpdesk_fabric::application::query::{EnhancedQueryService, EnhancedSettings};
use helpdesk_fabric::application::routing::{MessageRouter, RouteError};
use helpdesk_fabric::config::{AppConfig, ConfigError, LogFormat, ServerConfig, ValidationError};
use helpdesk_fabric::domain::knowledge::QueryMetrics;
use helpdesk_fabric::ports::{
    AIError, AIProvider, AdapterError, KnowledgeError, MessageArchive, QueryService,
    RemoteKnowledgeClient,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("knowledge setup failed: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("generation backend setup failed: {0}")]
    Ai(#[from] AIError),

    #[error("platform adapter setup failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("router failed to start: {0}")]
    Router(#[from] RouteError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    tracing::info!(
        environment = ?config.server.environment,
        remote_knowledge = config.knowledge.has_remote(),
        "Starting helpdesk fabric"
    );

    let min_score = config.knowledge.score_threshold;
    let index = match &config.knowledge.local_documents_path {
        Some(path) => InMemoryKnowledgeIndex::from_yaml_file(path, min_score).await?,
        None => InMemoryKnowledgeIndex::with_builtin_faq(min_score),
    };

    let remote: Option<Arc<dyn RemoteKnowledgeClient>> = match &config.knowledge.base_url {
        Some(base_url) if config.knowledge.has_remote() => {
            let mut http = HttpKnowledgeConfig::new(base_url.clone())
                .with_timeout(config.knowledge.search_timeout());
            if let Some(key) = &config.knowledge.api_key {
                http = http.with_api_key(key.clone());
            }
            Some(Arc::new(HttpKnowledgeClient::new(http)?) as Arc<dyn RemoteKnowledgeClient>)
        }
        _ => None,
    };

    let ai: Arc<dyn AIProvider> = match &config.ai.api_key {
        Some(key) if config.ai.has_api_key() => Arc::new(OpenAIProvider::new(
            OpenAIConfig::new(key.clone())
                .with_model(config.ai.model.clone())
                .with_base_url(config.ai.base_url.clone())
                .with_timeout(config.ai.timeout()),
        )?),
        _ => {
            tracing::warn!("No generation API key configured, using the mock provider");
            Arc::new(MockAIProvider::new())
        }
    };

    tracing::info!(model = ai.model(), "Generation backend ready");

    let breaker = Arc::new(InMemoryCircuitBreaker::new(
        "knowledge",
        config.resilience.breaker_config(),
    ));
    let service = Arc::new(EnhancedQueryService::new(
        ai,
        remote,
        breaker,
        Arc::new(index),
        Arc::new(QueryMetrics::new()),
        EnhancedSettings {
            retrieval: config.knowledge.retrieval_settings(),
            generation: config.ai.generation_settings(),
            remote_enabled: config.knowledge.remote_enabled,
            fallback_enabled: config.knowledge.fallback_enabled,
        },
    ));
    let controls = service.controls();
    let query_service: Arc<dyn QueryService> = service;

    let (hub, hub_task) = ConnectionHub::spawn();
    let archive: Arc<dyn MessageArchive> = Arc::new(InMemoryMessageArchive::default());
    let router = MessageRouter::with_config(
        Arc::clone(&query_service),
        hub.clone(),
        Some(archive),
        config.router.routing_settings(),
    );

    let web = Arc::new(WebAdapter::new(hub.clone()));
    router.register_adapter("web", web.clone()).await?;

    if let Some(telegram) = &config.platforms.telegram {
        let adapter = TelegramAdapter::new(telegram.settings())?;
        router.register_adapter("telegram", Arc::new(adapter)).await?;
    }

    let mut webhooks = Vec::new();
    if let Some(webhook) = &config.platforms.webhook {
        let adapter = Arc::new(WebhookChatAdapter::new(webhook.settings())?);
        router
            .register_adapter(webhook.id.clone(), adapter.clone())
            .await?;
        webhooks.push(adapter);
    }

    router.start().await?;

    let app = Router::new()
        .merge(websocket_router().with_state(WebSocketState::new(
            hub.clone(),
            web,
            config.hub.connection_settings(),
        )))
        .merge(webhook_router().with_state(WebhookState::new(webhooks)))
        .merge(operator_router().with_state(OperatorAppState {
            query_service,
            controls,
            hub: hub.clone(),
            router: router.clone(),
        }))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    router.stop().await;
    hub.shutdown();
    if let Err(e) = hub_task.await {
        tracing::warn!(error = %e, "Connection hub task ended abnormally");
    }
    tracing::info!("Shutdown complete");

    served.map_err(StartupError::from)
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.effective_log_format() {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
