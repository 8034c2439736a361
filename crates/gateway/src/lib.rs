//! HTTP webhook gateway for RelayCRM.
//!
//! Exposes the inbound edge of the platform: a health check and the
//! webhook endpoint, with the authenticity gate applied before any payload
//! parsing.
//!
//! Two layers guard `/webhook`, in request order:
//! 1. `capture_raw_body` — buffers the exact bytes of the request body and
//!    attaches them to the request extensions. This is the only place the
//!    body is read; handlers parse from the captured bytes, so the bytes
//!    the signature is checked against are byte-identical to what the
//!    sender signed.
//! 2. `signature_gate` — runs the HMAC verification and rejects with a
//!    structured JSON error before the handler is reached.
//!
//! Built on Axum for high performance async HTTP.

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::{
    Extension, Router,
    body::{Body, Bytes},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use relaycrm_core::{GateError, InboundEvent};
use relaycrm_security::{SIGNATURE_HEADER, verify_signature};

/// Request body cap. Webhook deliveries are small; anything larger is junk.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
///
/// Configuration is loaded once at startup and never mutated at runtime.
pub struct GatewayState {
    pub config: relaycrm_config::AppConfig,
    /// Hand-off to the message-routing pipeline for verified deliveries.
    pub events: mpsc::Sender<InboundEvent>,
}

pub type SharedState = Arc<GatewayState>;

/// The exact bytes of the request body, captured before any parsing.
#[derive(Clone)]
pub struct RawBody(pub Bytes);

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/webhook", post(webhook_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            signature_gate,
        ))
        .layer(middleware::from_fn(capture_raw_body));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: relaycrm_config::AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (events_tx, mut events_rx) = mpsc::channel::<InboundEvent>(64);

    // No routing pipeline runs in-process; verified deliveries are logged.
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!(event_id = %event.id, "inbound event ready for routing");
        }
    });

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState {
        config,
        events: events_tx,
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Middleware ---

/// Buffer the request body and attach the exact bytes to the request.
///
/// Must sit outside the signature gate: the gate verifies against these
/// bytes and treats their absence as a deployment defect.
async fn capture_raw_body(req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to buffer webhook request body");
            return gate_response(&GateError::MissingRawBody);
        }
    };

    parts.extensions.insert(RawBody(bytes.clone()));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Reject any delivery that cannot be proven to originate from the
/// configured sender. Runs strictly before the handler; on success the
/// request passes through unchanged.
async fn signature_gate(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let raw = req.extensions().get::<RawBody>().map(|r| r.0.clone());
    let secret = state.config.webhook.signing_secret.as_deref();

    match verify_signature(header.as_deref(), raw.as_deref(), secret) {
        Ok(()) => next.run(req).await,
        Err(err) => gate_response(&err),
    }
}

/// Map a gate failure to its HTTP rejection.
///
/// Config defects surface as 500s with bodies distinct from the 401/403
/// client rejections, so operators can tell a mis-wired deployment from an
/// attack in logs and metrics.
fn gate_response(err: &GateError) -> Response {
    let (status, message) = match err {
        GateError::MissingSignature => (StatusCode::UNAUTHORIZED, "Signature missing"),
        GateError::MissingRawBody => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        GateError::MissingSecret => (StatusCode::INTERNAL_SERVER_ERROR, "Server Config Error"),
        GateError::SignatureMismatch => (StatusCode::FORBIDDEN, "Invalid Signature"),
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept a verified webhook delivery and hand it to the routing pipeline.
///
/// Parsing happens here, after the gate — from the captured raw bytes, not
/// from a re-read of the request body.
async fn webhook_handler(
    State(state): State<SharedState>,
    Extension(raw): Extension<RawBody>,
) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&raw.0) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "verified webhook payload is not valid JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid JSON payload" })),
            )
                .into_response();
        }
    };

    let event = InboundEvent::new(payload);
    let event_id = event.id;

    if state.events.send(event).await.is_err() {
        error!("event pipeline closed — dropping verified delivery");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Internal Server Error" })),
        )
            .into_response();
    }

    debug!(event_id = %event_id, "webhook delivery accepted");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "received", "id": event_id })),
    )
        .into_response()
}
