mod keepalive;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bordas_common::codec::{self, CodecError};
use bordas_common::config::{Config, PipelineConfig};
use bordas_common::filter::contours::{contour_mask, ContourMaskParams};
use bytes::BytesMut;
use keepalive::KeepAliveSettings;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Multipart field carrying the uploaded image.
const IMAGE_FIELD: &str = "image";

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    pipeline: PipelineConfig,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ProcessedImage {
    #[serde(rename = "processedImage")]
    processed_image: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("Nenhum arquivo enviado")]
    MissingFile,
    #[error("Arquivo sem conteúdo")]
    EmptyFile,
    #[error("Arquivo muito grande")]
    TooLarge,
    #[error("Falha ao decodificar imagem")]
    Decode,
    #[error("invalid multipart body: {0}")]
    BadMultipart(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::EmptyFile
            | ApiError::Decode
            | ApiError::BadMultipart(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Empty => ApiError::EmptyFile,
            CodecError::Decode(_) => ApiError::Decode,
            CodecError::Encode(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "image processing failed");
        } else {
            info!(status = status.as_u16(), error = %self, "rejected upload");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Pipeline (sync, wrapped in spawn_blocking)
// ---------------------------------------------------------------------------

/// Decode, shrink to fit, outline the large contours, and return the mask as
/// a JPEG data URL.
fn process_upload(bytes: &[u8], pipeline: &PipelineConfig) -> Result<String, CodecError> {
    let decoded = codec::decode_image(bytes)?;
    let fitted = codec::fit_within(decoded, pipeline.max_dimension);
    let gray = codec::to_gray_bt601(&fitted);
    let mask = contour_mask(&gray, &ContourMaskParams::from(pipeline));
    let jpeg = codec::encode_jpeg(&mask, pipeline.jpeg_quality)?;
    debug!(
        width = mask.width(),
        height = mask.height(),
        jpeg_bytes = jpeg.len(),
        "mask encoded"
    );
    Ok(codec::jpeg_data_url(&jpeg))
}

/// Read the `image` field, failing fast once it grows past `max_bytes`.
async fn read_image_field(mut multipart: Multipart, max_bytes: usize) -> Result<BytesMut, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadMultipart(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!(name = field.name(), "skipping multipart field");
            continue;
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadMultipart(e.to_string()))?
        {
            if buf.len() + chunk.len() > max_bytes {
                return Err(ApiError::TooLarge);
            }
            buf.extend_from_slice(&chunk);
        }
        if buf.is_empty() {
            return Err(ApiError::EmptyFile);
        }
        return Ok(buf);
    }
    Err(ApiError::MissingFile)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /process_image, multipart field `image`
async fn process_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessedImage>, ApiError> {
    debug!(?headers, "process_image request");
    let multipart = multipart.map_err(|e| ApiError::BadMultipart(e.body_text()))?;
    let bytes = read_image_field(multipart, state.pipeline.max_upload_bytes).await?;
    info!(bytes = bytes.len(), "image received");

    let pipeline = state.pipeline.clone();
    let processed_image = tokio::task::spawn_blocking(move || process_upload(&bytes, &pipeline))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ProcessedImage { processed_image }))
}

fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/process_image", post(process_image))
        // uploads are size-checked while streaming so oversized files get a JSON 413
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let config = match Config::resolve(std::env::args().nth(1).map(PathBuf::from)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let keepalive_addr = format!("{}:{}", config.server.host, config.server.keepalive_port);
    if let Err(e) = keepalive::spawn(keepalive_addr, KeepAliveSettings::from(&config.server)) {
        error!(error = %e, "failed to start keep-alive thread");
    }

    let state = Arc::new(AppState {
        pipeline: config.pipeline.clone(),
    });
    let app = create_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(
        addr,
        max_upload_bytes = config.pipeline.max_upload_bytes,
        max_dimension = config.pipeline.max_dimension,
        "bordas API server starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
