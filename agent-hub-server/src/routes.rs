use std::sync::Arc;
use std::time::Duration;

use agent_hub_shared::{ChatRequest, HealthStatus, ModelCard, ModelList, ServiceInfo};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::completion::{complete, SERVICE_MODEL_LABEL};
use crate::error::HubError;
use crate::llm::{CallOptions, ModelProvider};
use crate::stream::{spawn_stream, STREAM_PACE};

pub const SERVICE_VERSION: &str = "0.1.0";
const MODEL_CREATED: i64 = 1_677_610_602;
const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn ModelProvider>,
    stream_pace: Duration,
}

impl AppState {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            stream_pace: STREAM_PACE,
        }
    }

    /// Overrides the delay between streamed fragments.
    pub fn with_stream_pace(mut self, pace: Duration) -> Self {
        self.stream_pace = pace;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "LangChain Agent Hub is running!".to_string(),
        version: SERVICE_VERSION.to_string(),
        status: "ready".to_string(),
    })
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: SERVICE_MODEL_LABEL.to_string(),
    })
}

async fn list_models() -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: vec![ModelCard {
            id: SERVICE_MODEL_LABEL.to_string(),
            object: "model".to_string(),
            created: MODEL_CREATED,
            owned_by: SERVICE_MODEL_LABEL.to_string(),
            permission: Vec::new(),
            root: SERVICE_MODEL_LABEL.to_string(),
            parent: None,
        }],
    })
}

// The body is parsed as JSON whatever the declared content type.
async fn chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, HubError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected chat request: {}", e);
        HubError::from(e)
    })?;

    info!(
        "Chat request: {} messages, model {:?}, stream {}",
        request.messages.len(),
        request.model,
        request.stream
    );

    // An empty model id counts as absent.
    let requested = request.model.as_deref().filter(|m| !m.is_empty());
    let label = requested.unwrap_or(SERVICE_MODEL_LABEL).to_string();
    let options = CallOptions::from_request(&request);
    let model = state.provider.get_client(requested, &options)?;

    if request.stream {
        let frames = spawn_stream(request.messages, model, label, state.stream_pace);
        let response = (
            [(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)],
            Body::from_stream(frames),
        );
        return Ok(response.into_response());
    }

    let completion = complete(&request.messages, model.as_ref(), &label).await?;
    Ok(Json(completion).into_response())
}
