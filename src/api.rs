use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::engine::DealEngine;

pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DealEngine>,
    pub min_query_len: usize,
}

impl AppState {
    pub fn new(engine: DealEngine, min_query_len: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            min_query_len,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/sources", get(sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "online", "message": "Environment is ready!" }))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(alias = "query")]
    q: Option<String>,
}

fn unprocessable(msg: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": msg }))).into_response()
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return unprocessable(rejection.body_text()),
    };
    let raw = params.q.unwrap_or_default();
    let query = raw.trim();
    if query.chars().count() < state.min_query_len {
        return unprocessable(format!(
            "query parameter 'q' must be at least {} characters",
            state.min_query_len
        ));
    }

    let (resp, status) = state.engine.search(query).await;
    ([(CACHE_HEADER, status.as_header())], Json(resp)).into_response()
}

async fn sources(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.engine.marketplaces())
}
