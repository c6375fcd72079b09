mod images;
mod links;
mod nodes;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Users
        .route("/users/create_user", post(users::create_user))
        .route("/users/get_access_token", post(users::get_access_token))
        .route("/users/reset_user_info", put(users::reset_user_info))
        .route("/users/get_user_info", post(users::get_user_info))
        .route("/users/set_user_premium", put(users::set_user_premium))
        .route("/users/forgot-password", post(users::forgot_password))
        .route("/users/reset-password", post(users::reset_password))
        // Nodes
        .route("/nodes/create_node", post(nodes::create_node))
        .route("/nodes/update_node", put(nodes::update_node))
        .route("/nodes/delete_node", delete(nodes::delete_node))
        .route("/nodes/list_nodes", get(nodes::list_nodes))
        .route("/nodes/get_node_info", post(nodes::get_node_info))
        // Images
        .route("/images/get_upload_url", post(images::get_upload_url))
        .route("/images/confirm_upload", post(images::confirm_upload))
        .route("/images/get_url_by_name", post(images::get_url_by_name))
        .route("/images/get_image_info", post(images::get_image_info))
        .route("/images/delete_image_file", delete(images::delete_image_file))
        // Links
        .route("/nodelinks/create_link", post(links::create_link))
        .route("/nodelinks/list_links", get(links::list_links))
        .route("/nodelinks/delete_link", delete(links::delete_link))
}
