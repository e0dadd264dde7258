//! HTTP server for the matrix API.
//!
//! Every operation takes a multipart form with a `file` field holding the
//! CSV matrix and answers with the result as plain text.
//!
//! # API Endpoints
//!
//! | Method | Path        | Description                                  |
//! |--------|-------------|----------------------------------------------|
//! | GET    | `/health`   | Health check                                 |
//! | GET    | `/api/logs` | SSE stream for real-time logs                |
//! | POST   | `/echo`     | Matrix re-rendered as CSV                    |
//! | POST   | `/invert`   | Transposed matrix as CSV                     |
//! | POST   | `/flatten`  | All cells, comma separated, row-major        |
//! | POST   | `/sum`      | Sum of all cells                             |
//! | POST   | `/multiply` | Product of all cells                         |
//!
//! Echo and invert buffer the upload and use the strict loader. Flatten, sum
//! and multiply stream the upload straight into the configured service.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_info, log_info_indent, LogEntry, LOG_BROADCASTER};
use super::types::{error_reply, ErrorReply, HealthResponse};
use super::upload::{read_file_field, stream_file_field};
use crate::config::{ServerConfig, Strategy};
use crate::error::{MatrixResult, ServerError, ServerResult};
use crate::models::Matrix;
use crate::parser::load_matrix;
use crate::service::{join_outcome, MatrixProcessor, SerialMatrixService, StreamingMatrixService};

/// Shared handler state.
pub struct AppState<S> {
    pub service: Arc<S>,
    pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Echo,
    Invert,
    Flatten,
    Sum,
    Multiply,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Echo => "echo",
            Operation::Invert => "invert",
            Operation::Flatten => "flatten",
            Operation::Sum => "sum",
            Operation::Multiply => "multiply",
        };
        f.write_str(name)
    }
}

const ENDPOINTS: &[&str] = &[
    "POST /echo",
    "POST /invert",
    "POST /flatten",
    "POST /sum",
    "POST /multiply",
    "GET /api/logs (SSE)",
];

/// Build the router around `service`.
pub fn router<S: MatrixProcessor>(service: S, config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = config.max_upload_bytes;
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(health::<S>))
        .route("/health", get(health::<S>))
        .route("/api/logs", get(sse_logs))
        .route("/echo", post(echo::<S>))
        .route("/invert", post(invert::<S>))
        .route("/flatten", post(flatten::<S>))
        .route("/sum", post(sum::<S>))
        .route("/multiply", post(multiply::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Serve `service` on an already bound listener.
pub async fn serve<S: MatrixProcessor>(
    listener: TcpListener,
    service: S,
    config: ServerConfig,
) -> ServerResult<()> {
    axum::serve(listener, router(service, config)).await?;
    Ok(())
}

/// Start the HTTP server with the strategy named in `config`.
pub async fn start_server(config: ServerConfig) -> ServerResult<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;

    println!("🚀 Matrix API running on http://{}", addr);
    println!("   Strategy: {}", config.strategy);
    if config.strategy == Strategy::Streaming {
        println!("   Channel capacity: {}", config.channel_capacity);
    }
    for endpoint in ENDPOINTS {
        println!("   {}", endpoint);
    }
    println!();
    log_info(format!("Max upload size: {} bytes", config.max_upload_bytes));

    match config.strategy {
        Strategy::Serial => serve(listener, SerialMatrixService::new(), config).await,
        Strategy::Streaming => {
            let service = StreamingMatrixService::new(config.channel_capacity);
            serve(listener, service, config).await
        }
    }
}

/// Health check endpoint
async fn health<S: MatrixProcessor>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "matrix-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        strategy: state.service.name().to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged subscribers skip missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// =============================================================================
// Operation handlers
// =============================================================================

async fn echo<S: MatrixProcessor>(
    State(state): State<AppState<S>>,
    multipart: Multipart,
) -> Result<String, ErrorReply> {
    let service = state.service.clone();
    materialized(Operation::Echo, &state, multipart, move |m| service.echo(m)).await
}

async fn invert<S: MatrixProcessor>(
    State(state): State<AppState<S>>,
    multipart: Multipart,
) -> Result<String, ErrorReply> {
    let service = state.service.clone();
    materialized(Operation::Invert, &state, multipart, move |m| service.invert(m)).await
}

async fn flatten<S: MatrixProcessor>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<String, ErrorReply> {
    let request = RequestLog::start(Operation::Flatten, state.service.name());
    let service = state.service.clone();
    let result = stream_file_field(&mut multipart, state.config.upload_buffer, |reader| async move {
        service.flatten(reader).await
    })
    .await;
    request.finish(result)
}

async fn sum<S: MatrixProcessor>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<String, ErrorReply> {
    let request = RequestLog::start(Operation::Sum, state.service.name());
    let service = state.service.clone();
    let result = stream_file_field(&mut multipart, state.config.upload_buffer, |reader| async move {
        service.sum(reader).await.map(|total| total.to_string())
    })
    .await;
    request.finish(result)
}

async fn multiply<S: MatrixProcessor>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<String, ErrorReply> {
    let request = RequestLog::start(Operation::Multiply, state.service.name());
    let service = state.service.clone();
    let result = stream_file_field(&mut multipart, state.config.upload_buffer, |reader| async move {
        service.multiply(reader).await.map(|total| total.to_string())
    })
    .await;
    request.finish(result)
}

/// Buffer the upload, load it strictly, then render.
async fn materialized<S, F>(
    op: Operation,
    state: &AppState<S>,
    mut multipart: Multipart,
    render: F,
) -> Result<String, ErrorReply>
where
    S: MatrixProcessor,
    F: FnOnce(&Matrix) -> String + Send + 'static,
{
    let request = RequestLog::start(op, state.service.name());
    let result = match read_file_field(&mut multipart).await {
        Ok(bytes) => {
            log_info_indent(format!("Received {} bytes", bytes.len()), 1);
            load_and_render(bytes, render).await
        }
        Err(err) => Err(err),
    };
    request.finish(result)
}

/// Parse and render on a blocking worker; both are linear in the upload size.
async fn load_and_render<F>(bytes: Bytes, render: F) -> MatrixResult<String>
where
    F: FnOnce(&Matrix) -> String + Send + 'static,
{
    let joined =
        tokio::task::spawn_blocking(move || load_matrix(&bytes[..]).map(|matrix| render(&matrix)))
            .await;
    join_outcome(joined)
}

/// Per-request log context.
struct RequestLog {
    id: Uuid,
    op: Operation,
    started: Instant,
}

impl RequestLog {
    fn start(op: Operation, strategy: &str) -> Self {
        let id = Uuid::new_v4();
        LOG_BROADCASTER.log(LogEntry::info(format!("📄 /{} ({})", op, strategy)).with_request(id));
        Self {
            id,
            op,
            started: Instant::now(),
        }
    }

    fn finish(self, result: MatrixResult<String>) -> Result<String, ErrorReply> {
        let elapsed = self.started.elapsed();
        match result {
            Ok(body) => {
                LOG_BROADCASTER.log(
                    LogEntry::success(format!("/{} done in {:?} ({} bytes)", self.op, elapsed, body.len()))
                        .with_request(self.id),
                );
                Ok(body)
            }
            Err(err) => {
                LOG_BROADCASTER.log(
                    LogEntry::error(format!("/{} rejected: {} [{}]", self.op, err, err.kind()))
                        .with_request(self.id),
                );
                Err(error_reply(self.id, &ServerError::from(err)))
            }
        }
    }
}
