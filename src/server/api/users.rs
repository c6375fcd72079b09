use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    CreateUserRequest, ForgotPasswordRequest, LoginForm, ResetPasswordRequest,
    ResetUserInfoParams,
};
use crate::server::response::{ApiError, MessageResponse};

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let user = state
        .accounts
        .signup(&req.first_name, &req.surname, &req.email, &req.password)?;

    Ok::<_, ApiError>(Json(user))
}

pub async fn get_access_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let token = state.accounts.login(&form.username, &form.password)?;

    Ok::<_, ApiError>(Json(token))
}

pub async fn reset_user_info(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetUserInfoParams>,
) -> impl IntoResponse {
    state
        .accounts
        .reset_field(&auth.user_id, params.reset_mode, &params.new_val)?;

    Ok::<_, ApiError>(Json(MessageResponse::new("User info updated")))
}

pub async fn get_user_info(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = state.accounts.get_user_info(&auth.user_id)?;

    Ok::<_, ApiError>(Json(user))
}

pub async fn set_user_premium(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = state.accounts.upgrade_to_premium(&auth.user_id)?;

    Ok::<_, ApiError>(Json(user))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    let message = state.accounts.forgot_password(&req.email).await;

    Json(MessageResponse::new(message))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    state
        .accounts
        .reset_password(&req.token, &req.new_password)?;

    Ok::<_, ApiError>(Json(MessageResponse::new(
        "Password has been reset successfully",
    )))
}
