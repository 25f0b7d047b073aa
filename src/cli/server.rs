//! HTTP server mode: the browser-facing relay

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::retry::RetryError;
use crate::vocab::{DefineRequest, VocabularyRequest, VocabularyService};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by CORS (empty = any origin)
    pub allowed_origins: Vec<String>,
}

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    service: VocabularyService,
    /// Fires on shutdown so in-flight retry loops stop waiting
    shutdown: CancellationToken,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    fn error(code: &'static str, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
            code: Some(code),
        }
    }
}

/// Build the relay router
pub fn router(
    service: VocabularyService,
    allowed_origins: &[String],
    shutdown: CancellationToken,
) -> Result<Router> {
    let state = AppState { service, shutdown };

    Ok(Router::new()
        .route("/health", get(health))
        .route("/api/vocabulary", post(generate_vocabulary))
        .route("/api/define", post(define_word))
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

/// Build the CORS layer; an empty list allows any origin
fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.trim_end_matches('/'))
                    .map_err(|e| Error::invalid_value("server.allowed_origins", format!("{o}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, service: VocabularyService) -> Result<()> {
    let shutdown = CancellationToken::new();
    let app = router(service, &config.allowed_origins, shutdown.clone())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting relay on http://{}", addr);
    if config.allowed_origins.is_empty() {
        tracing::warn!("CORS allows any origin; set server.allowed_origins in production");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {}: {e}", config.port)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("Shutting down");
    token.cancel();
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Generate vocabulary for a topic or word list
async fn generate_vocabulary(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VocabularyRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => run(&state, request).await,
        Err(rejection) => bad_body(&rejection),
    }
}

/// Define a single word
async fn define_word(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<DefineRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => run(&state, request.into()).await,
        Err(rejection) => bad_body(&rejection),
    }
}

async fn run(state: &AppState, request: VocabularyRequest) -> Response {
    match state
        .service
        .generate_with_cancel(request, &state.shutdown)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))).into_response(),
        Err(e) => error_response(&e),
    }
}

fn bad_body(rejection: &JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            "INVALID_REQUEST",
            format!("Invalid request body: {}", rejection.body_text()),
        )),
    )
        .into_response()
}

/// Map a relay error to an HTTP response.
///
/// Quota exhaustion gets its own status and code so the client can tell the
/// user to wait or shrink the batch instead of showing a generic failure.
fn error_response(err: &Error) -> Response {
    let (status, code) = match err {
        Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        Error::Retry(RetryError::RateLimitExhausted { .. }) => {
            (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXHAUSTED")
        }
        Error::Retry(RetryError::Propagated { status, .. }) => (
            status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "UPSTREAM_ERROR",
        ),
        Error::Retry(RetryError::Cancelled { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed with {}: {}", status.as_u16(), err);
    } else {
        tracing::warn!("Request failed with {}: {}", status.as_u16(), err);
    }

    (status, Json(ApiResponse::<()>::error(code, err.to_string()))).into_response()
}
