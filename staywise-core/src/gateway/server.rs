//! Chat gateway server built on axum.

use crate::assistant::{ChatTurn, HotelAssistant};
use crate::config::ServerConfig;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state for the gateway handlers.
pub struct GatewayState {
    pub assistant: Arc<HotelAssistant>,
    pub static_dir: PathBuf,
}

impl GatewayState {
    pub fn new(assistant: Arc<HotelAssistant>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            assistant,
            static_dir: static_dir.into(),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Reply of `POST /chat`: the raw response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Build the router: `/chat`, `/health`, `/` and `/static`.
pub fn router(state: Arc<GatewayState>) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route_service("/", index)
        .nest_service("/static", assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match state
        .assistant
        .chat(&request.message, &request.history)
        .await
    {
        Ok(outcome) => Json(ChatResponse {
            response: outcome.output,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    detail: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.assistant.model_name(),
        "live_facts": state.assistant.has_live_facts(),
    }))
}

/// Serve on `config.host:config.port` until cancelled.
pub async fn run(config: &ServerConfig, assistant: Arc<HotelAssistant>) -> Result<(), std::io::Error> {
    let state = Arc::new(GatewayState::new(assistant, &config.static_dir));
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
