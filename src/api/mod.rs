use crate::config::AppConfig;
use crate::core::readiness::ReadinessView;
use crate::core::traits::InferenceBackend;
use axum::Router;
use axum::http::Method;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod chat;
pub mod history;
pub mod status;

/// Static facts about this deployment, served by `/api/config`.
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub title: String,
    pub version: String,
    pub git_commit: String,
    pub build_date: String,
    pub region: String,
    pub role: String,
}

impl AppInfo {
    pub fn from_config(config: &AppConfig) -> Self {
        AppInfo {
            title: config.chat_title.clone(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_owned(),
            build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_owned(),
            region: config.region.clone(),
            role: config.role.clone(),
        }
    }
}

/// Shared handles every handler can reach through `Extension<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub readiness: ReadinessView,
    pub backend: Arc<dyn InferenceBackend>,
    pub info: Arc<AppInfo>,
}

/// All `/api` routes. The DI provider is attached by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ws", axum::routing::get(chat::chat_socket))
        .merge(history::router())
        .merge(status::router())
        .layer(axum::Extension(state))
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(Any),
        )
}
