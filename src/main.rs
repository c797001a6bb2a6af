//! Ollama chat relay server
//!
//! (c) Softlandia 2025

use tokio_ollama_chat_api::api;
use tokio_ollama_chat_api::api::{AppInfo, AppState};
use tokio_ollama_chat_api::config::AppConfig;
use tokio_ollama_chat_api::core;
use tokio_ollama_chat_api::core::readiness::readiness_channel;
use tokio_ollama_chat_api::core::services::MyChatHistoryService;
use tokio_ollama_chat_api::core::traits::InferenceBackend;
use tokio_ollama_chat_api::infrastructure::database::DatabaseConnection;
use tokio_ollama_chat_api::infrastructure::ollama::OllamaClient;
use tokio_ollama_chat_api::infrastructure::repositories::DbChatHistoryRepository;

use anyhow::{Context, anyhow};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    if config.ollama_enabled {
        info!("Using Ollama service at {} with dynamic model detection", config.ollama_url);
    } else {
        info!("Ollama disabled - AI features will be unavailable");
    }

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    let backend: Arc<dyn InferenceBackend> = Arc::new(OllamaClient::new(config.ollama_url.clone())?);
    let (publisher, readiness) = readiness_channel();

    // background task for model warm-up
    let warmup_join_handle = runtime.spawn(core::warmup::background_task(
        backend.clone(),
        config.ollama_enabled,
        config.warmup.clone(),
        publisher,
    ));

    let state = AppState {
        readiness,
        backend,
        info: Arc::new(AppInfo::from_config(&config)),
    };
    let web_task_handle = runtime.spawn(web_server_task(state, config.port));

    runtime.block_on(async {
        web_task_handle
            .await
            .context("failed to join web_task_handle")??;
        warmup_join_handle
            .await
            .context("failed to join warmup_join_handle")?;
        Ok::<(), anyhow::Error>(())
    })
}

async fn web_server_task(state: AppState, port: u16) -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(DatabaseConnection::singleton())
        .add(DbChatHistoryRepository::scoped())
        .add(MyChatHistoryService::scoped())
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e:?}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await
        .context("failed to run database migrations")?;
    info!("Table chat_history is ready");

    let app = api::router(state).with_provider(provider);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("WebSocket server started on {}", listener.local_addr()?);
    info!("Chat will respond with waiting messages until the Ollama service is ready");
    axum::serve(listener, app).await?;
    info!("Shutting down...");
    Ok(())
}
