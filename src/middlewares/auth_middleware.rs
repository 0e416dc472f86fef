use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::user::{Actor, Role};
use crate::util::error::HandlerError;
use crate::util::jwt::{bearer_token, Claims, JwtError, JwtTokenUtils, JwtTokenUtilsImpl, TokenKind};

/// Guard state for one group of routes. An empty `allowed` list admits any
/// authenticated user.
pub struct AuthState {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub allowed: Vec<Role>,
}

impl AuthState {
    pub fn new(jwt_utils: Arc<JwtTokenUtilsImpl>, allowed: &[Role]) -> Arc<Self> {
        Arc::new(AuthState { jwt_utils, allowed: allowed.to_vec() })
    }
}

/// Validates an access token and turns its claims into the caller.
pub fn authenticate_token(jwt_utils: &JwtTokenUtilsImpl, token: &str) -> Result<(Claims, Actor), HandlerError> {
    let claims = jwt_utils.verify(token, TokenKind::Access).map_err(|e| match e {
        JwtError::Expired => HandlerError::unauthorized("Token expired"),
        other => {
            debug!("Rejected access token: {}", other);
            HandlerError::unauthorized("Invalid token")
        }
    })?;
    let actor = claims.actor().map_err(|_| HandlerError::unauthorized("Invalid token subject"))?;
    Ok((claims, actor))
}

fn authenticate_headers(jwt_utils: &JwtTokenUtilsImpl, headers: &HeaderMap) -> Result<(Claims, Actor), HandlerError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::unauthorized("Not authorized, no token"))?;
    let token = bearer_token(auth_header).map_err(|_| HandlerError::unauthorized("Malformed authorization header"))?;
    authenticate_token(jwt_utils, token)
}

/// The caller behind an optional bearer token; invalid tokens count as anonymous.
pub fn actor_from_headers(jwt_utils: &JwtTokenUtilsImpl, headers: &HeaderMap) -> Option<Actor> {
    authenticate_headers(jwt_utils, headers).ok().map(|(_, actor)| actor)
}

pub async fn require_roles(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let (claims, actor) = authenticate_headers(&state.jwt_utils, req.headers())?;

    if !state.jwt_utils.check_role_permission(actor.role, &state.allowed) {
        warn!(user = %actor.id, role = %actor.role, path = %req.uri().path(), "Role not permitted");
        return Err(HandlerError::forbidden(format!(
            "User role {} is not authorized to access this route",
            actor.role
        )));
    }

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
