use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{FileNameParams, ImageIdParams};
use crate::server::response::{ApiError, MessageResponse};

pub async fn get_upload_url(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileNameParams>,
) -> impl IntoResponse {
    let url = state
        .images
        .get_upload_url(&auth.user_id, &params.file_name)?;

    Ok::<_, ApiError>(Json(url))
}

pub async fn confirm_upload(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileNameParams>,
) -> impl IntoResponse {
    let image = state
        .images
        .confirm_upload(&auth.user_id, &params.file_name)
        .await?;

    Ok::<_, ApiError>(Json(image))
}

pub async fn get_url_by_name(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileNameParams>,
) -> impl IntoResponse {
    let url = state
        .images
        .get_url_by_name(&auth.user_id, &params.file_name)?;

    Ok::<_, ApiError>(Json(url))
}

pub async fn get_image_info(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImageIdParams>,
) -> impl IntoResponse {
    let image = state
        .images
        .get_image_info(&auth.user_id, &params.image_id)?;

    Ok::<_, ApiError>(Json(image))
}

pub async fn delete_image_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileNameParams>,
) -> impl IntoResponse {
    state
        .images
        .delete_image_file(&auth.user_id, &params.file_name)
        .await?;

    Ok::<_, ApiError>(Json(MessageResponse::new("Image deleted")))
}
