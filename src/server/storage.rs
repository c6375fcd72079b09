use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;

use super::AppState;
use super::dto::{SignatureParams, StoragePath};
use super::response::ApiError;

/// Object endpoints reached through signed URLs; no bearer token involved.
pub fn storage_router() -> Router<Arc<AppState>> {
    Router::new().route("/{user_id}/{file_name}", get(download).put(upload))
}

fn content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Path(path): Path<StoragePath>,
    Query(params): Query<SignatureParams>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if body.is_empty() {
        return Err(ApiError::unprocessable("Empty upload"));
    }

    state
        .images
        .store_object(
            &path.user_id,
            &path.file_name,
            params.expires,
            &params.signature,
            &body,
        )
        .await?;

    Ok(StatusCode::OK)
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<StoragePath>,
    Query(params): Query<SignatureParams>,
) -> Result<Response, ApiError> {
    let (file, size) = state
        .images
        .open_object(&path.user_id, &path.file_name, params.expires, &params.signature)
        .await?;

    let stream = ReaderStream::new(file);
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&path.file_name).to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
