use axum::{
    extract::{Extension, Json, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::dto::user_dto::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, TokensEnvelope, UpdateProfileRequest, UserEnvelope, UsersEnvelope,
    UsersQuery,
};
use crate::middlewares::auth_middleware::actor_from_headers;
use crate::model::user::Actor;
use crate::service::user_service::UserService;
use crate::util::error::HandlerError;
use crate::util::jwt::JwtTokenUtilsImpl;

#[derive(Clone)]
pub struct UserHandlerState {
    pub service: Arc<dyn UserService>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

// Register
pub async fn register_handler(
    State(state): State<UserHandlerState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let caller = actor_from_headers(&state.jwt_utils, &headers);
    let res = state.service.register(payload, caller).await?;
    info!(user = %res.user.id, "Registration completed");
    Ok((StatusCode::CREATED, Json(res)))
}

// Login
pub async fn login_handler(
    State(state): State<UserHandlerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let res = state.service.login(payload.email, payload.password).await?;
    Ok(Json(res))
}

// Refresh Token
pub async fn refresh_token_handler(
    State(state): State<UserHandlerState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let tokens = state.service.refresh_token(payload.refresh_token).await?;
    Ok(Json(TokensEnvelope { success: true, tokens }))
}

pub async fn me_handler(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state.service.me(&actor).await?;
    Ok(Json(UserEnvelope { success: true, user }))
}

pub async fn update_profile_handler(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let user = state.service.update_profile(&actor, payload).await?;
    Ok(Json(UserEnvelope { success: true, user }))
}

pub async fn list_users_handler(
    State(state): State<UserHandlerState>,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let users = state.service.list_users(query.role).await?;
    Ok(Json(UsersEnvelope { success: true, count: users.len(), users }))
}
