use crate::config::{GatewayConfig, UpstreamSettings};
use crate::error::{GatewayError, Result};
use crate::keys::{bearer_token, KeySet};
use crate::logging::{ExchangeRecord, SharedExchangeLog};
use crate::media::MediaResolver;
use crate::models;
use crate::proxy::{self, RouteKind};
use crate::translate::openai_types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatErrorResponse,
};
use crate::translate::streaming::{StreamEmulator, StreamSettings};

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request bodies above this size are refused before parsing.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

const RESPONSES_UNSUPPORTED: &str =
    "OpenAI Responses/Web Search is not supported by this gateway. Disable web search in the client.";

/// Process-wide, read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamSettings,
    pub client: reqwest::Client,
    pub media: MediaResolver,
    pub keys: KeySet,
    pub stream: StreamSettings,
    pub journal: Option<SharedExchangeLog>,
}

impl AppState {
    /// Resolve a loaded config into serving state. Reads secrets from the environment once.
    pub fn from_config(config: &GatewayConfig, journal: Option<SharedExchangeLog>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;

        Ok(Self {
            upstream: config.upstream_settings(),
            media: config.media_resolver(client.clone()),
            client,
            keys: config.key_set()?,
            stream: config.stream_settings(),
            journal,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/v1/chat/completions", post(handle_chat_normal))
        .route("/code/v1/chat/completions", post(handle_chat_code))
        .route("/v1/models", get(handle_models_normal))
        .route("/code/v1/models", get(handle_models_code))
        .route("/v1/responses", post(handle_responses))
        .route("/code/v1/responses", post(handle_responses))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(handle_health))
        .merge(api)
        .method_not_allowed_fallback(handle_not_found)
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = authorize(&state.keys, request.headers()) {
        return e.into_response();
    }
    next.run(request).await
}

fn authorize(keys: &KeySet, headers: &HeaderMap) -> Result<()> {
    if keys.is_empty() {
        return Err(GatewayError::other("No API keys configured on server"));
    }

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| keys.contains(token));

    if authorized {
        Ok(())
    } else {
        Err(GatewayError::unauthorized("Invalid API key"))
    }
}

async fn handle_chat_normal(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_chat(state, RouteKind::Normal, body).await
}

async fn handle_chat_code(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_chat(state, RouteKind::Code, body).await
}

async fn handle_chat(state: Arc<AppState>, route: RouteKind, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected chat request body");
            return GatewayError::invalid_input(format!("Invalid JSON: {e}")).into_response();
        }
    };

    let streaming = req.stream.unwrap_or(false);

    tracing::info!(
        route = route.as_str(),
        model = %req.model,
        streaming,
        messages = req.messages.len(),
        "Chat completion request"
    );

    let started = Instant::now();
    let result =
        proxy::proxy_chat(&req, route, &state.upstream, &state.client, &state.media).await;
    let record = ExchangeRecord::new(route.as_str(), req.model.as_str(), streaming)
        .with_latency(started.elapsed());

    match result {
        Ok(resp) => {
            let record = match resp.usage {
                Some(u) => record.with_usage(u.prompt_tokens, u.completion_tokens),
                None => record,
            };
            journal(&state, record);

            if streaming {
                pseudo_stream(&state, &resp, &req.model)
            } else {
                Json(resp).into_response()
            }
        }
        Err(e) => {
            let status = e.status_code();
            tracing::error!(status = status.as_u16(), error = %e, "Chat completion failed");
            journal(&state, record.failed(status.as_u16(), e.to_string()));
            e.into_response()
        }
    }
}

fn pseudo_stream(state: &AppState, resp: &ChatCompletionResponse, model: &str) -> Response {
    let emulator = StreamEmulator::new(resp, model, state.stream);
    tracing::debug!(chunks = emulator.content_chunks(), "Replaying response as stream");

    let events = emulator
        .into_stream()
        .map(|frame| -> std::result::Result<Event, Infallible> {
            Ok(Event::default().data(frame.data()))
        });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn journal(state: &AppState, record: ExchangeRecord) {
    if let Some(ref log) = state.journal {
        log.record(record);
    }
}

async fn handle_models_normal(State(state): State<Arc<AppState>>) -> Response {
    handle_models(state, RouteKind::Normal).await
}

async fn handle_models_code(State(state): State<Arc<AppState>>) -> Response {
    handle_models(state, RouteKind::Code).await
}

async fn handle_models(state: Arc<AppState>, route: RouteKind) -> Response {
    match models::relay_models(route, &state.upstream, &state.client).await {
        Ok(relayed) => Response::builder()
            .status(StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY))
            .header(header::CONTENT_TYPE, relayed.content_type)
            .body(Body::from(relayed.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Model listing failed");
            e.into_response()
        }
    }
}

async fn handle_responses() -> Response {
    GatewayError::invalid_input(RESPONSES_UNSUPPORTED).into_response()
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let reachable = proxy::probe_upstream(&state.upstream, &state.client).await;

    Json(serde_json::json!({
        "ok": true,
        "upstream": if reachable { "ok" } else { "unreachable" },
        "upstreamUrl": state.upstream.base_url,
    }))
}

/// Unknown paths and wrong methods on known ones. Callers must still authenticate.
async fn handle_not_found(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.keys, &headers) {
        return e.into_response();
    }
    (StatusCode::NOT_FOUND, Json(ChatErrorResponse::new("Not found"))).into_response()
}
