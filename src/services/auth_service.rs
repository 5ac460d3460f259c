use std::sync::Arc;

use crate::{
    auth::{hash_password, verify_password, JwtService},
    errors::{AppError, AppResult},
    models::{
        domain::{
            refresh_token::{hash_token, ClientInfo},
            RefreshToken, User,
        },
        dto::{
            request::{LoginRequest, RefreshTokenRequest, RegisterRequest},
            response::{AccessTokenResponse, AuthResponse},
        },
    },
    repositories::{RefreshTokenRepository, UserRepository},
    services::parse_object_id,
};

const TAKEN_MESSAGE: &str = "Username or email is already taken";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt,
        }
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        client: ClientInfo,
    ) -> AppResult<AuthResponse> {
        let request = request.normalized()?;

        if self
            .users
            .find_by_username_or_email(&request.username, &request.email)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(TAKEN_MESSAGE.to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let user = User::new(&request.username, &request.email, &password_hash);

        // a concurrent registration can still trip the unique indexes
        let user = self.users.create(user).await.map_err(|e| match e {
            AppError::AlreadyExists(_) => AppError::AlreadyExists(TAKEN_MESSAGE.to_string()),
            other => other,
        })?;

        log::debug!("Registered user {} ({})", user.username, user.id_hex());
        self.issue_tokens(user, client).await
    }

    pub async fn login(&self, request: LoginRequest, client: ClientInfo) -> AppResult<AuthResponse> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::ValidationError(
                "Email and password are required".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for {}", user.id_hex());
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue_tokens(user, client).await
    }

    pub async fn refresh(&self, request: RefreshTokenRequest) -> AppResult<AccessTokenResponse> {
        let token = required_token(request)?;

        let stored = self
            .refresh_tokens
            .find_by_token_hash(&hash_token(&token))
            .await?
            .filter(RefreshToken::is_valid)
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        let claims = self.jwt.validate_refresh_token(&token)?;
        if claims.sub != stored.user_id.to_hex() {
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        let user_id = parse_object_id(&claims.sub, "User not found")?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let access_token = self.jwt.create_token(&user)?;
        Ok(AccessTokenResponse { access_token })
    }

    /// Revoking an unknown or already revoked token succeeds.
    pub async fn logout(&self, request: RefreshTokenRequest) -> AppResult<()> {
        let token = required_token(request)?;
        if self
            .refresh_tokens
            .revoke_by_token_hash(&hash_token(&token))
            .await?
        {
            log::info!("Refresh token revoked");
        }
        Ok(())
    }

    async fn issue_tokens(&self, user: User, client: ClientInfo) -> AppResult<AuthResponse> {
        let user_id = user
            .id
            .ok_or_else(|| AppError::InternalError("User has no id".to_string()))?;

        let access_token = self.jwt.create_token(&user)?;
        let refresh_token = self.jwt.create_refresh_token(&user_id.to_hex())?;

        self.refresh_tokens
            .create(RefreshToken::new(
                user_id,
                hash_token(&refresh_token),
                self.jwt.refresh_expires_at(),
                client,
            ))
            .await?;

        Ok(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
        })
    }
}

fn required_token(request: RefreshTokenRequest) -> AppResult<String> {
    request
        .refresh_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::ValidationError("Refresh token is required".to_string()))
}
