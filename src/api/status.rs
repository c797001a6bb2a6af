//! Model status and deployment info endpoints

use crate::api::AppState;
use crate::api::status::schemas::{ConfigResponse, ReadyResponse};
use crate::core::readiness::StatusSnapshot;
use axum::routing::get;
use axum::{Extension, Json, Router};

pub fn router() -> Router {
    Router::new()
        .route("/api/model-status", get(model_status))
        .route("/api/ready", get(ready))
        .route("/api/config", get(config))
}

async fn model_status(Extension(state): Extension<AppState>) -> Json<StatusSnapshot> {
    Json(state.readiness.snapshot())
}

async fn ready(Extension(state): Extension<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: state.readiness.is_ready(),
    })
}

async fn config(Extension(state): Extension<AppState>) -> Json<ConfigResponse> {
    let info = &state.info;
    Json(ConfigResponse {
        title: info.title.clone(),
        version: info.version.clone(),
        git_commit: info.git_commit.clone(),
        build_date: info.build_date.clone(),
        model: state.readiness.status().model.unwrap_or_default(),
        region: info.region.clone(),
        role: info.role.clone(),
    })
}

pub mod schemas {
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct ReadyResponse {
        pub ready: bool,
    }

    #[derive(Serialize, Debug)]
    pub struct ConfigResponse {
        pub title: String,
        pub version: String,
        pub git_commit: String,
        pub build_date: String,
        pub model: String,
        pub region: String,
        pub role: String,
    }
}
