use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::AdminUserConfig;
use crate::dto::user_dto::{AuthTokens, RegisterRequest, UpdateProfileRequest, UserAuthResponse, UserWithoutPassword};
use crate::model::user::{Actor, Role, User};
use crate::repository::user_repo::UserRepository;
use crate::util::error::{ServiceError, ServiceResult};
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenKind};
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

#[async_trait]
pub trait UserService: Send + Sync {
    /// `caller` is the authenticated user, if the request carried a token.
    async fn register(&self, request: RegisterRequest, caller: Option<Actor>) -> ServiceResult<UserAuthResponse>;
    async fn login(&self, email: String, password: String) -> ServiceResult<UserAuthResponse>;
    async fn refresh_token(&self, refresh_token: String) -> ServiceResult<AuthTokens>;
    async fn me(&self, actor: &Actor) -> ServiceResult<UserWithoutPassword>;
    async fn update_profile(&self, actor: &Actor, request: UpdateProfileRequest) -> ServiceResult<UserWithoutPassword>;
    async fn list_users(&self, role: Option<Role>) -> ServiceResult<Vec<UserWithoutPassword>>;
    /// Creates the configured admin unless a user with that email exists.
    async fn ensure_admin(&self, config: &AdminUserConfig) -> ServiceResult<bool>;
}

pub struct UserServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

impl UserServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Self {
        Self { user_repo, jwt_utils }
    }

    fn issue_tokens(&self, user: &User) -> ServiceResult<AuthTokens> {
        let user_id = user
            .id
            .ok_or_else(|| ServiceError::InternalError("User has no id".to_string()))?;
        self.jwt_utils
            .issue_pair(user_id, &user.email, user.role)
            .map(AuthTokens::from)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))
    }

    fn hash(password: &str) -> ServiceResult<String> {
        PasswordUtilsImpl::validate_password_strength(password)
            .map_err(|errors| ServiceError::InvalidInput(errors.join("; ")))?;
        PasswordUtilsImpl::hash_password(password)
            .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))
    }

    async fn load(&self, actor: &Actor) -> ServiceResult<User> {
        self.user_repo
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}

/// Self-registration cannot mint admins; only an admin caller may.
pub fn effective_role(requested: Option<Role>, caller: Option<&Actor>) -> Role {
    match requested {
        Some(Role::Admin) if caller.map(|c| c.role) == Some(Role::Admin) => Role::Admin,
        Some(Role::Admin) | None => Role::Pharmacist,
        Some(role) => role,
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, request, caller), fields(email = %request.email))]
    async fn register(&self, request: RegisterRequest, caller: Option<Actor>) -> ServiceResult<UserAuthResponse> {
        let email = request.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            warn!("Registration with an existing email");
            return Err(ServiceError::Conflict("User already exists with this email".to_string()));
        }

        let role = effective_role(request.role, caller.as_ref());
        if request.role == Some(Role::Admin) && role != Role::Admin {
            warn!("Self-registered admin downgraded to {}", role);
        }

        let user = User {
            id: None,
            name: request.name.trim().to_string(),
            email,
            password_hash: Self::hash(&request.password)?,
            role,
            phone: request.phone,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        let inserted = self.user_repo.insert(user).await.map_err(|e| {
            error!("Failed to insert user: {e}");
            ServiceError::from(e)
        })?;
        let tokens = self.issue_tokens(&inserted)?;
        info!(role = %inserted.role, "User registered");
        Ok(UserAuthResponse { success: true, user: inserted.into(), tokens })
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: String, password: String) -> ServiceResult<UserAuthResponse> {
        let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());
        let user = match self.user_repo.find_by_email(&email.trim().to_lowercase()).await? {
            Some(user) => user,
            None => {
                warn!("Login for unknown email");
                return Err(invalid());
            }
        };
        let valid = PasswordUtilsImpl::verify_password(&password, &user.password_hash).map_err(|e| {
            error!("Stored password hash unusable: {}", e);
            invalid()
        })?;
        if !valid {
            warn!("Invalid credentials");
            return Err(invalid());
        }
        if !user.is_active {
            warn!("Login for deactivated user");
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }
        let tokens = self.issue_tokens(&user)?;
        info!("User logged in");
        Ok(UserAuthResponse { success: true, user: user.into(), tokens })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_token(&self, refresh_token: String) -> ServiceResult<AuthTokens> {
        let actor = self
            .jwt_utils
            .verify(&refresh_token, TokenKind::Refresh)
            .and_then(|claims| claims.actor())
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid refresh token: {}", e)))?;
        let user = self
            .user_repo
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User no longer exists".to_string()))?;
        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }
        // Re-read so role changes take effect on the next pair.
        self.issue_tokens(&user)
    }

    async fn me(&self, actor: &Actor) -> ServiceResult<UserWithoutPassword> {
        Ok(self.load(actor).await?.into())
    }

    #[instrument(skip(self, request), fields(user = %actor.id))]
    async fn update_profile(&self, actor: &Actor, request: UpdateProfileRequest) -> ServiceResult<UserWithoutPassword> {
        let mut user = self.load(actor).await?;
        if let Some(name) = request.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            user.phone = Some(phone);
        }
        if let Some(password) = request.password {
            user.password_hash = Self::hash(&password)?;
        }
        let updated = self.user_repo.update(actor.id, user).await?;
        info!("Profile updated");
        Ok(updated.into())
    }

    async fn list_users(&self, role: Option<Role>) -> ServiceResult<Vec<UserWithoutPassword>> {
        let users = self.user_repo.list(role).await?;
        Ok(users.into_iter().map(UserWithoutPassword::from).collect())
    }

    #[instrument(skip(self, config), fields(email = %config.email))]
    async fn ensure_admin(&self, config: &AdminUserConfig) -> ServiceResult<bool> {
        let email = config.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            info!("Admin user already exists, skipping creation.");
            return Ok(false);
        }
        let user = User {
            id: None,
            name: config.name.clone(),
            email,
            password_hash: Self::hash(&config.password)?,
            role: Role::Admin,
            phone: config.phone.clone(),
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        self.user_repo.insert(user).await?;
        info!("First admin user created.");
        Ok(true)
    }
}
