//! HS256 access and refresh tokens for PharmaAssure users.

use std::fmt;

use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::model::user::{Actor, Role};

pub const BEARER: &str = "Bearer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Hex ObjectId of the user.
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// The user these claims were issued for.
    pub fn actor(&self) -> Result<Actor, JwtError> {
        let id = ObjectId::parse_str(&self.sub).map_err(|_| JwtError::BadSubject(self.sub.clone()))?;
        Ok(Actor::new(id, self.role))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to sign token: {0}")]
    Signing(String),
    #[error("Token has expired")]
    Expired,
    #[error("Token rejected: {0}")]
    Rejected(String),
    #[error("Expected a {expected} token, got a {actual} token")]
    WrongKind { expected: TokenKind, actual: TokenKind },
    #[error("Authorization header is not a bearer token")]
    MalformedHeader,
    #[error("Token subject is not a user id: {0}")]
    BadSubject(String),
}

/// Pulls the token out of an `Authorization: Bearer <token>` value.
pub fn bearer_token(header_value: &str) -> Result<&str, JwtError> {
    let token = header_value
        .strip_prefix(BEARER)
        .filter(|rest| rest.starts_with(' '))
        .map(str::trim)
        .ok_or(JwtError::MalformedHeader)?;
    if token.is_empty() {
        return Err(JwtError::MalformedHeader);
    }
    Ok(token)
}

pub trait JwtTokenUtils: Send + Sync {
    fn issue(&self, kind: TokenKind, user_id: ObjectId, email: &str, role: Role) -> Result<String, JwtError>;
    fn issue_pair(&self, user_id: ObjectId, email: &str, role: Role) -> Result<TokenPair, JwtError>;
    /// Checks signature, expiry, issuer and that the token is of `kind`.
    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError>;
    /// An empty `allowed` list admits every role.
    fn check_role_permission(&self, role: Role, allowed: &[Role]) -> bool;
}

#[derive(Debug, Clone)]
pub struct JwtTokenUtilsImpl {
    pub jwt_config: JwtConfig,
}

impl JwtTokenUtilsImpl {
    pub fn new(jwt_config: JwtConfig) -> Self {
        JwtTokenUtilsImpl { jwt_config }
    }

    fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => Duration::minutes(self.jwt_config.access_token_expiration),
            TokenKind::Refresh => Duration::minutes(self.jwt_config.refresh_token_expiration),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if let Some(issuer) = &self.jwt_config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

impl JwtTokenUtils for JwtTokenUtilsImpl {
    fn issue(&self, kind: TokenKind, user_id: ObjectId, email: &str, role: Role) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_hex(),
            email: email.to_string(),
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + self.lifetime(kind)).timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: self.jwt_config.jwt_issuer.clone(),
        };
        let key = EncodingKey::from_secret(self.jwt_config.jwt_secret.as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| {
            error!(user = %user_id, %kind, "Failed to sign token: {}", e);
            JwtError::Signing(e.to_string())
        })?;
        debug!(user = %user_id, %kind, %role, "Token issued");
        Ok(token)
    }

    fn issue_pair(&self, user_id: ObjectId, email: &str, role: Role) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, user_id, email, role)?,
            refresh_token: self.issue(TokenKind::Refresh, user_id, email, role)?,
            expires_in: self.lifetime(TokenKind::Access).num_seconds(),
            token_type: BEARER.to_string(),
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        let key = DecodingKey::from_secret(self.jwt_config.jwt_secret.as_bytes());
        let claims = decode::<Claims>(token, &key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => {
                    debug!("Token rejected: {}", e);
                    JwtError::Rejected(e.to_string())
                }
            })?
            .claims;
        if claims.kind != kind {
            warn!(user = %claims.sub, expected = %kind, actual = %claims.kind, "Token of the wrong kind");
            return Err(JwtError::WrongKind { expected: kind, actual: claims.kind });
        }
        Ok(claims)
    }

    fn check_role_permission(&self, role: Role, allowed: &[Role]) -> bool {
        allowed.is_empty() || allowed.contains(&role)
    }
}
