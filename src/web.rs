//! Public HTTP surface for the aggregation service.

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::article::Article;
use crate::cache::{CacheStatus, StalenessCache};
use crate::orchestrator::{FetchMode, FetchOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FetchOrchestrator>,
    pub cache: Arc<StalenessCache>,
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/sections/{name}", get(get_section))
        .route("/status", get(status))
        .route("/cache/clear", post(clear_cache))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Deserialize)]
struct SectionQuery {
    mode: Option<String>,
}

#[derive(Serialize)]
struct SectionEnvelope {
    success: bool,
    articles: Vec<Article>,
    partial: bool,
    total: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

/// Section endpoint. `success` is true even when `articles` is empty: absence
/// of content is not an error. The only failure is an unconfigured section.
async fn get_section(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SectionQuery>,
) -> Result<Json<SectionEnvelope>, (StatusCode, Json<ErrorEnvelope>)> {
    let mode = match params.mode.as_deref() {
        Some("full") => FetchMode::Full,
        _ => FetchMode::Fast,
    };

    match state.orchestrator.get_section(&name, mode).await {
        Ok(result) => Ok(Json(SectionEnvelope {
            success: true,
            total: result.articles.len(),
            articles: result.articles,
            partial: result.partial,
            timestamp: result.timestamp.to_rfc3339(),
        })),
        Err(err) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorEnvelope {
                success: false,
                error: err.to_string(),
            }),
        )),
    }
}

#[derive(Serialize)]
struct StatusEnvelope {
    success: bool,
    cache: CacheStatus,
}

async fn status(State(state): State<AppState>) -> Json<StatusEnvelope> {
    Json(StatusEnvelope {
        success: true,
        cache: state.cache.status().await,
    })
}

#[derive(Serialize)]
struct ClearEnvelope {
    success: bool,
}

async fn clear_cache(State(state): State<AppState>) -> Json<ClearEnvelope> {
    state.cache.clear().await;
    info!("Cache cleared via API");
    Json(ClearEnvelope { success: true })
}
