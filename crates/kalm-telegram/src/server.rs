//! HTTP surface: health, on-demand support voice, Telegram webhook intake.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use kalm_core::{
    domain::ChatId,
    ingestion::{Ingestion, UpdateMode},
    messaging::port::ChatTransport,
    ports::SpeechSynthesizer,
    prompts::{SupportCategory, SUPPORT_CAPTION},
    Result,
};

use crate::to_core_update;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Registers the bot's webhook with Telegram.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    async fn register_webhook(&self, url: &str, secret: Option<&str>) -> Result<()>;
}

#[derive(Clone)]
pub struct ApiState {
    pub ingestion: Arc<Ingestion>,
    pub transport: Arc<dyn ChatTransport>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub webhooks: Arc<dyn WebhookRegistrar>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/send-support", post(send_support))
        .route("/telegram/webhook", post(telegram_webhook))
        .route("/telegram/webhook/register", post(register_webhook))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Kalm API is running" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Debug, Deserialize)]
pub struct SupportRequest {
    #[serde(default)]
    pub addiction_type: String,
    #[serde(default)]
    pub telegram_chat_id: String,
}

#[derive(Debug, Serialize)]
pub struct SupportResponse {
    pub success: bool,
    pub message: &'static str,
}

async fn send_support(
    State(state): State<ApiState>,
    Json(req): Json<SupportRequest>,
) -> std::result::Result<Json<SupportResponse>, ApiError> {
    let raw_chat = req.telegram_chat_id.trim();
    if raw_chat.is_empty() {
        return Err(ApiError::bad_request("Telegram chat ID is required"));
    }
    let chat_id = raw_chat
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ApiError::bad_request(format!("invalid Telegram chat ID '{raw_chat}'")))?;

    let category = SupportCategory::parse(&req.addiction_type);
    tracing::info!(chat_id = %chat_id, category = ?category, "sending support voice message");

    let audio = state
        .synthesizer
        .synthesize(category.support_message(), None)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "support synthesis failed");
            ApiError::internal(format!("Error: {e}"))
        })?;

    state
        .transport
        .send_voice(chat_id, audio, Some(SUPPORT_CAPTION))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, chat_id = %chat_id, "support delivery failed");
            ApiError::internal(format!("Error: {e}"))
        })?;

    Ok(Json(SupportResponse {
        success: true,
        message: "Voice message sent to your Telegram!",
    }))
}

#[derive(Serialize)]
struct WebhookResponse {
    ok: bool,
}

/// Acknowledges every authenticated push, decodable or not.
async fn telegram_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let given = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if given != expected {
            tracing::warn!("webhook request with bad secret token");
            return (StatusCode::UNAUTHORIZED, Json(WebhookResponse { ok: false }));
        }
    }

    match serde_json::from_slice::<teloxide::types::Update>(&body) {
        Ok(update) => match to_core_update(&update) {
            Some(u) => {
                state.ingestion.submit(u).await;
            }
            None => tracing::debug!(update_id = update.id, "ignoring non-message update"),
        },
        Err(e) => tracing::warn!(error = %e, "undecodable webhook body"),
    }

    (StatusCode::OK, Json(WebhookResponse { ok: true }))
}

#[derive(Debug, Default, Deserialize)]
struct RegisterRequest {
    url: Option<String>,
}

async fn register_webhook(
    State(state): State<ApiState>,
    body: Bytes,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let req: RegisterRequest = if body.is_empty() {
        RegisterRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))?
    };

    let url = req
        .url
        .filter(|u| !u.trim().is_empty())
        .or_else(|| state.webhook_url.clone())
        .ok_or_else(|| ApiError::bad_request("no webhook url given and WEBHOOK_URL is not set"))?;

    state
        .webhooks
        .register_webhook(&url, state.webhook_secret.as_deref())
        .await
        .map_err(|e| ApiError::internal(format!("webhook registration failed: {e}")))?;

    state
        .ingestion
        .start(UpdateMode::Webhook)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(url = %url, "webhook registered");
    Ok(Json(json!({ "ok": true, "url": url })))
}
