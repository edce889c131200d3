use crate::errors::ApiError;
use crate::service::{Upload, UploadReceipt, UploadService};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path},
    response::IntoResponse,
    routing::{get, post},
};
use headers::{ContentDisposition, ContentLength, ContentType, HeaderMapExt};
use http::{HeaderValue, header};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Multipart field the upload form is expected to use.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
struct StatusResponse {
    filename: String,
    status: crate::registry::UploadStatus,
}

/// Builds the HTTP surface. `max_upload_bytes` of `None` lifts the body limit.
pub fn router(service: Arc<UploadService>, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload))
        .route("/upload/", post(upload))
        .route("/status/{file_id}", get(status))
        .route("/status/{file_id}/", get(status))
        .route("/files/{file_id}", get(get_file))
        .route("/files/{file_id}/", get(get_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(body_limit)
                .layer(Extension(service)),
        )
}

async fn health() -> &'static str {
    "OK\nupload-registry"
}

async fn upload(
    Extension(service): Extension<Arc<UploadService>>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, ApiError> {
    let mut fallback = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from)?
    {
        let named_file = field.name() == Some(FILE_FIELD);
        if !named_file && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing filename.".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(ApiError::from)?;

        let upload = Upload {
            filename,
            content_type,
            bytes,
        };
        if named_file {
            return Ok(Json(service.upload(upload).await?));
        }
        fallback = Some(upload);
    }

    match fallback {
        Some(upload) => Ok(Json(service.upload(upload).await?)),
        None => Err(ApiError::BadRequest("Missing file field.".to_string())),
    }
}

async fn status(
    Path(file_id): Path<String>,
    Extension(service): Extension<Arc<UploadService>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = service.status(&file_id).await?;
    Ok(Json(StatusResponse {
        filename: record.filename,
        status: record.status,
    }))
}

async fn get_file(
    Path(file_id): Path<String>,
    Extension(service): Extension<Arc<UploadService>>,
) -> Result<impl IntoResponse, ApiError> {
    let (record, file) = service.retrieve(&file_id).await?;

    let mut response = file.body.into_response();
    let response_headers = response.headers_mut();
    response_headers.typed_insert(ContentType::from(record.content_type));
    response_headers.typed_insert(ContentLength(file.len));

    // Names that cannot be quoted into the header fall back to a bare `inline`.
    let disposition = (!record.filename.contains('"'))
        .then(|| format!("inline; filename=\"{}\"", record.filename))
        .and_then(|value| HeaderValue::from_str(&value).ok());
    match disposition {
        Some(value) => {
            response_headers.insert(header::CONTENT_DISPOSITION, value);
        }
        None => response_headers.typed_insert(ContentDisposition::inline()),
    }

    Ok(response)
}
