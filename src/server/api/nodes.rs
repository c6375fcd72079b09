use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateNodeRequest, ListNodesParams, NodeIdParams, UpdateNodeRequest};
use crate::server::response::{ApiError, MessageResponse};

pub async fn create_node(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNodeRequest>,
) -> impl IntoResponse {
    let new = req.into_new_node()?;
    let node = state.nodes.create_node(&auth.user_id, new).await?;

    Ok::<_, ApiError>(Json(node))
}

pub async fn update_node(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateNodeRequest>,
) -> impl IntoResponse {
    let (node_id, update) = req.into_update()?;
    let node = state
        .nodes
        .update_node(&auth.user_id, &node_id, update)
        .await?;

    Ok::<_, ApiError>(Json(node))
}

pub async fn delete_node(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<NodeIdParams>,
) -> impl IntoResponse {
    state
        .nodes
        .delete_node(&auth.user_id, &params.node_id)
        .await?;

    Ok::<_, ApiError>(Json(MessageResponse::new("Node deleted")))
}

pub async fn list_nodes(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListNodesParams>,
) -> impl IntoResponse {
    let page = state
        .nodes
        .list_nodes(&auth.user_id, params.limit, params.offset)?;

    Ok::<_, ApiError>(Json(page))
}

pub async fn get_node_info(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<NodeIdParams>,
) -> impl IntoResponse {
    let node = state.nodes.get_node_info(&auth.user_id, &params.node_id)?;

    Ok::<_, ApiError>(Json(node))
}
