//! HTTP surface: axum router, admission middleware and JSON error mapping.
//!
//! ```text
//! request ─▶ TraceLayer ─▶ size guard ─▶ rate limit ─▶ convert_pdf
//!                          (Content-Length)  (per client)
//! ```
//!
//! Both guards answer before the multipart body is read, so a rejected
//! request costs no parsing and no worker time. `/health` skips both.

use crate::admission::{check_content_length, RateLimiter};
use crate::config::ServiceConfig;
use crate::convert::{Converter, Upload};
use crate::engine::PdfEngine;
use crate::error::ConvertError;
use crate::output::ConversionResult;
use crate::pool::WorkerPool;
use axum::{
    extract::{
        multipart::MultipartRejection, ConnectInfo, DefaultBodyLimit, Extension, Multipart,
        Request, State,
    },
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span, warn, Instrument};

/// Shared state handed to every handler.
pub struct AppState<E: PdfEngine> {
    pub converter: Converter<E>,
    pub limiter: Arc<RateLimiter>,
    pub max_file_size: u64,
}

impl<E: PdfEngine> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            converter: self.converter.clone(),
            limiter: Arc::clone(&self.limiter),
            max_file_size: self.max_file_size,
        }
    }
}

impl<E: PdfEngine> AppState<E> {
    /// Wire the process-wide services together.
    pub fn new(config: &ServiceConfig, engine: Arc<E>, pool: Arc<WorkerPool>) -> Self {
        Self {
            converter: Converter::new(engine, pool, config.max_pages),
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            max_file_size: config.max_file_size,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}

/// Client identity used for rate limiting, set by the rate-limit middleware.
#[derive(Debug, Clone)]
pub struct ClientKey(pub String);

/// Build the API router.
pub fn build_router<E: PdfEngine>(state: AppState<E>) -> Router {
    let body_limit = usize::try_from(state.max_file_size).unwrap_or(usize::MAX);

    let convert = Router::new()
        .route("/convert", post(convert_pdf::<E>))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::<E>))
        .route_layer(middleware::from_fn_with_state(state.clone(), size_guard::<E>));

    Router::new()
        .route("/health", get(health_check))
        .merge(convert)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn start_server<E: PdfEngine>(addr: &str, state: AppState<E>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<E, F>(listener: TcpListener, state: AppState<E>, shutdown: F) -> std::io::Result<()>
where
    E: PdfEngine,
    F: Future<Output = ()> + Send + 'static,
{
    info!("Listening on {}", listener.local_addr()?);
    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /convert`: multipart upload with a `file` field.
async fn convert_pdf<E: PdfEngine>(
    State(state): State<AppState<E>>,
    client: Option<Extension<ClientKey>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResult>, ConvertError> {
    let client = client.map_or_else(|| "unknown".to_string(), |Extension(ClientKey(k))| k);
    let span = info_span!("convert", client = %client);

    async move {
        let mut multipart = multipart.map_err(|e| {
            debug!("Rejected multipart body: {}", e);
            ConvertError::InvalidFileType { filename: None }
        })?;
        let upload = read_upload(&mut multipart, state.max_file_size).await?;
        let result = state.converter.convert(upload).await?;
        Ok(Json(result))
    }
    .instrument(span)
    .await
}

/// Pull the `file` field out of the form. Other fields are ignored.
async fn read_upload(multipart: &mut Multipart, max_file_size: u64) -> Result<Upload, ConvertError> {
    let body_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ConvertError::PayloadTooLarge {
                limit_bytes: max_file_size,
            }
        } else {
            debug!("Malformed multipart body: {}", e);
            ConvertError::InvalidFileType { filename: None }
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(body_error)?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ConvertError::InvalidFileType { filename: None })
}

// ── Middleware ───────────────────────────────────────────────────────────

async fn size_guard<E: PdfEngine>(
    State(state): State<AppState<E>>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if let Err(e) = check_content_length(declared, state.max_file_size) {
        warn!(
            "Rejected upload of {} bytes (max {})",
            declared.unwrap_or_default(),
            state.max_file_size
        );
        return e.into_response();
    }
    next.run(request).await
}

async fn rate_limit<E: PdfEngine>(
    State(state): State<AppState<E>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    if let Err(e) = state.limiter.check(&key) {
        warn!("Rate limit exceeded for {} ({})", key, state.limiter.limit());
        return e.into_response();
    }
    request.extensions_mut().insert(ClientKey(key));
    next.run(request).await
}

/// Identify the caller: first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the socket peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
