use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateLinkRequest, LinkIdParams};
use crate::server::response::{ApiError, MessageResponse};

pub async fn create_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLinkRequest>,
) -> impl IntoResponse {
    let link =
        state
            .links
            .create_link(&auth.user_id, &req.source_node_id, &req.target_node_id)?;

    Ok::<_, ApiError>(Json(link))
}

pub async fn list_links(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let links = state.links.list_links(&auth.user_id)?;

    Ok::<_, ApiError>(Json(links))
}

pub async fn delete_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<LinkIdParams>,
) -> impl IntoResponse {
    state.links.delete_link(&auth.user_id, &params.link_id)?;

    Ok::<_, ApiError>(Json(MessageResponse::new("Link deleted")))
}
