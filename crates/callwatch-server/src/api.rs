//! REST API for the call tracker
//!
//! Four routes drive the tracker: status lookup, call placement, the
//! provider's lifecycle status webhook, and the provider's voice webhook.
//! The two webhook routes are lenient by contract — the provider retries on
//! non-2xx, so they parse defensively and always answer success.

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use callwatch_core::{AnsweredBy, CallId, CallTracker, StatusEvent, TrackerError};

use crate::config::ServerConfig;
use crate::provider::{CallbackConfig, TelephonyProvider};
use crate::validation::is_valid_phone_number;
use crate::webhook::{fallback_markup, MarkupParams, VoiceWebhook};

/// Shared state behind every route.
#[derive(Clone)]
pub struct ApiState {
    pub tracker: CallTracker,
    pub provider: Arc<dyn TelephonyProvider>,
    pub webhook: Arc<dyn VoiceWebhook>,
    pub config: ServerConfig,
}

/// Build the API router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/status/:call_id", get(get_call_status))
        .route("/call", get(place_call))
        .route("/call-status", post(call_status_callback))
        .route("/voice", post(voice_callback))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Request/response types

#[derive(Debug, Deserialize)]
struct PlaceCallParams {
    to: String,
    from: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceCallResponse {
    message: String,
    call_sid: String,
    to: String,
    from: String,
    status: String,
    status_url: String,
}

/// Provider status callback body. Everything is optional: a malformed or
/// partial delivery is logged and dropped, never bounced back as an error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusCallbackForm {
    call_sid: Option<String>,
    call_status: Option<String>,
    sip_response_code: Option<String>,
    call_duration: Option<String>,
    answered_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VoiceCallbackForm {
    call_sid: Option<String>,
    to: Option<String>,
    from: Option<String>,
}

// Handlers

async fn get_call_status(
    State(state): State<ApiState>,
    Path(call_id): Path<String>,
) -> Result<Json<callwatch_core::CallRecord>, AppError> {
    let record = state
        .tracker
        .status(&CallId::new(call_id))
        .await
        .ok_or(AppError::NotFound)?;
    Ok(Json(record))
}

async fn place_call(
    State(state): State<ApiState>,
    Query(params): Query<PlaceCallParams>,
) -> Result<Json<PlaceCallResponse>, AppError> {
    if !is_valid_phone_number(&params.to) {
        return Err(AppError::BadRequest(format!(
            "invalid 'to' phone number: {}",
            params.to
        )));
    }
    if !is_valid_phone_number(&params.from) {
        return Err(AppError::BadRequest(format!(
            "invalid 'from' phone number: {}",
            params.from
        )));
    }

    let callbacks = CallbackConfig {
        status_callback_url: state.config.status_callback_url(),
        voice_url: state.config.voice_url(),
    };
    let handle = state
        .provider
        .place_call(&params.to, &params.from, &callbacks)
        .await?;

    let record = state
        .tracker
        .register_call(
            CallId::new(handle.sid.clone()),
            params.to.clone(),
            params.from.clone(),
            &handle.status,
        )
        .await?;

    Ok(Json(PlaceCallResponse {
        message: "call placed".to_string(),
        call_sid: handle.sid.clone(),
        to: record.to,
        from: record.from,
        status: record.status.to_string(),
        status_url: state.config.status_url(&handle.sid),
    }))
}

async fn call_status_callback(
    State(state): State<ApiState>,
    Form(form): Form<StatusCallbackForm>,
) -> StatusCode {
    let (call_sid, call_status) = match (form.call_sid, form.call_status) {
        (Some(sid), Some(status)) if !sid.is_empty() => (sid, status),
        _ => {
            tracing::warn!("dropping status callback without call sid or status");
            return StatusCode::OK;
        }
    };

    let event = StatusEvent {
        call_id: CallId::new(call_sid),
        raw_status: call_status,
        sip_code: form
            .sip_response_code
            .and_then(|code| code.trim().parse::<u16>().ok()),
        duration_secs: form
            .call_duration
            .and_then(|duration| duration.trim().parse::<u64>().ok()),
        answered_by: form
            .answered_by
            .filter(|value| !value.is_empty())
            .map(|value| AnsweredBy::parse(&value)),
    };

    state.tracker.handle_status_event(event).await;
    StatusCode::OK
}

async fn voice_callback(
    State(state): State<ApiState>,
    Form(form): Form<VoiceCallbackForm>,
) -> Response {
    match serve_voice(&state, &form).await {
        Ok(markup) => xml_response(markup),
        Err(e) => {
            tracing::warn!(error = %e, "voice webhook failed, serving fallback markup");
            if let Some(sid) = form.call_sid.filter(|sid| !sid.is_empty()) {
                state
                    .tracker
                    .record_failure(&CallId::new(sid), "voice webhook failed")
                    .await;
            }
            xml_response(fallback_markup())
        }
    }
}

async fn serve_voice(
    state: &ApiState,
    form: &VoiceCallbackForm,
) -> callwatch_core::Result<String> {
    let to = form
        .to
        .as_deref()
        .ok_or_else(|| TrackerError::Webhook("voice callback without dialed number".to_string()))?;

    let number = state.provider.lookup_number_config(to).await?;
    let target = state.webhook.resolve(&number).await?;
    let params = MarkupParams {
        call_id: form.call_sid.clone().unwrap_or_default(),
        caller: form.from.clone().unwrap_or_default(),
    };
    state.webhook.fetch_markup(&target, &params).await
}

async fn health_check(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let stats = state.tracker.stats().await;
    Json(serde_json::json!({
        "status": "ok",
        "records": stats.records,
        "trackedCalls": stats.tracked_calls,
        "armedTimeouts": stats.armed_timeouts,
    }))
}

fn xml_response(markup: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], markup).into_response()
}

// Error handling

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound,
    Upstream(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    message: None,
                },
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "call not found".to_string(),
                    message: None,
                },
            ),
            AppError::Upstream(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "upstream provider failure".to_string(),
                    message: Some(message),
                },
            ),
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal error".to_string(),
                        message: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Provider(message) | TrackerError::Webhook(message) => {
                AppError::Upstream(message)
            }
            TrackerError::NotFound(_) => AppError::NotFound,
            other => AppError::Internal(other.into()),
        }
    }
}
