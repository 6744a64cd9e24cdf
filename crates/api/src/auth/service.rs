//! Authentication Service: credential checks, token issuance and session
//! lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;
use workhub_core::error::CoreError;
use workhub_core::tokens::TokenKind;
use workhub_core::types::{DbId, Timestamp};
use workhub_core::validation::validate_input;
use workhub_db::models::session::{CreateSession, Session};
use workhub_db::models::user::{CreateUser, User};
use workhub_db::repositories::UserRepo;
use workhub_db::DbPool;

use crate::auth::jwt::{IssuedToken, TokenAuthority, UserInfo};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{map_unique_violation, AppError, AppResult};
use crate::session::SessionStore;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Request body for `POST /auth/register`.
///
/// The password length floor is configurable and checked separately.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "must be 3 to 32 characters"))]
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// Successful login or refresh.
#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token (and so the session) expires.
    pub expires_at: Timestamp,
    pub user: UserInfo,
}

/// Where a login came from, recorded on the session row.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates the credential store, the Token Authority and the session store.
#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    tokens: Arc<TokenAuthority>,
    sessions: SessionStore,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(
        pool: DbPool,
        tokens: Arc<TokenAuthority>,
        sessions: SessionStore,
        password_min_length: usize,
    ) -> Self {
        Self {
            pool,
            tokens,
            sessions,
            password_min_length,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Arc::clone(&state.tokens),
            state.sessions.clone(),
            state.config.password_min_length,
        )
    }

    /// Verify credentials, issue a token pair and record a session.
    ///
    /// Unknown email and wrong password fail with distinct variants that
    /// render the same message to the client.
    pub async fn login(&self, input: &LoginRequest, client: ClientMeta) -> AppResult<LoginResult> {
        validate_input(input)?;

        let Some(user) = UserRepo::find_by_email(&self.pool, &input.email).await? else {
            tracing::warn!(email = %input.email, "Login rejected: unknown email");
            return Err(CoreError::UsernameOrPasswordIncorrect.into());
        };

        if !self.check_password(&input.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(CoreError::PasswordIncorrect.into());
        }

        let result = self.open_session(&user, client).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(result)
    }

    /// Create an account. Email and username must both be unused.
    pub async fn register(&self, input: &RegisterRequest) -> AppResult<UserInfo> {
        validate_input(input)?;
        validate_password_strength(&input.password, self.password_min_length)
            .map_err(|msg| CoreError::Validation(format!("password: {msg}")))?;

        if UserRepo::find_by_email(&self.pool, &input.email).await?.is_some() {
            return Err(CoreError::TakenCredential { field: "email" }.into());
        }
        if UserRepo::find_by_username(&self.pool, &input.username)
            .await?
            .is_some()
        {
            return Err(CoreError::TakenCredential { field: "username" }.into());
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

        let create = CreateUser {
            email: input.email.clone(),
            username: input.username.clone(),
            password_hash,
        };
        let user = UserRepo::create(&self.pool, &create).await.map_err(|e| {
            map_unique_violation(
                e,
                &[("uq_users_email", "email"), ("uq_users_username", "username")],
            )
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(UserInfo::from(&user))
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The session holding the presented token is revoked (rotation), so each
    /// refresh token works once.
    pub async fn refresh(&self, input: &RefreshRequest, client: ClientMeta) -> AppResult<LoginResult> {
        validate_input(input)?;

        let claims = self.tokens.verify_refresh(&input.refresh_token).map_err(|e| {
            tracing::warn!(error = %e, "Refresh rejected: bad token");
            invalid_refresh_token()
        })?;

        let session = self
            .sessions
            .find_by_refresh_token(&input.refresh_token)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.user.id, "Refresh rejected: no active session");
                invalid_refresh_token()
            })?;

        // Whoever wins the revoke owns the rotation; a concurrent replay loses.
        if self.sessions.revoke(session.id).await?.is_none() {
            return Err(invalid_refresh_token());
        }

        let user = UserRepo::find_by_id(&self.pool, session.user_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("User no longer exists".into()))?;

        let result = self.open_session(&user, client).await?;
        tracing::info!(user_id = %user.id, old_session_id = %session.id, "Session refreshed");
        Ok(result)
    }

    /// Revoke the session bound to `access_token`.
    pub async fn logout(&self, access_token: &str) -> AppResult<()> {
        let session = self
            .sessions
            .get_by_token(access_token)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("Session is no longer active".into()))?;
        self.sessions.revoke(session.id).await?;
        Ok(())
    }

    /// Revoke every session of `user_id`. Returns how many were active.
    pub async fn logout_all(&self, user_id: DbId) -> AppResult<usize> {
        Ok(self.sessions.revoke_all(user_id).await?)
    }

    /// Active sessions of `user_id`, newest first.
    pub async fn list_sessions(&self, user_id: DbId) -> AppResult<Vec<Session>> {
        Ok(self.sessions.list_active(user_id).await?)
    }

    /// Replace the password after checking the current one, then revoke
    /// every session so other devices must log in again.
    pub async fn change_password(
        &self,
        user_id: DbId,
        input: &ChangePasswordRequest,
    ) -> AppResult<()> {
        validate_input(input)?;
        validate_password_strength(&input.new_password, self.password_min_length)
            .map_err(|msg| CoreError::Validation(format!("new_password: {msg}")))?;

        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        if !self.check_password(&input.current_password, &user.password_hash)? {
            tracing::warn!(user_id = %user_id, "Password change rejected: wrong current password");
            return Err(CoreError::PasswordIncorrect.into());
        }

        let password_hash = hash_password(&input.new_password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
        UserRepo::update_password(&self.pool, user_id, &password_hash).await?;

        let revoked = self.sessions.revoke_all(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "Password changed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn check_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        verify_password(password, hash)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))
    }

    fn issue(&self, info: &UserInfo, kind: TokenKind) -> AppResult<IssuedToken> {
        self.tokens
            .issue(info, kind)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
    }

    /// Issue a pair, persist the session (must succeed), mirror it (may fail).
    async fn open_session(&self, user: &User, client: ClientMeta) -> AppResult<LoginResult> {
        let info = UserInfo::from(user);
        let access = self.issue(&info, TokenKind::Access)?;
        let refresh = self.issue(&info, TokenKind::Refresh)?;

        let input = CreateSession {
            user_id: user.id,
            access_token: access.token.clone(),
            refresh_token: refresh.token.clone(),
            expires_at: access.expires_at,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        };
        let session = self.sessions.create_session(&input).await?;
        tracing::debug!(session_id = %session.id, user_id = %user.id, "Session opened");

        Ok(LoginResult {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_at: access.expires_at,
            user: info,
        })
    }
}

fn invalid_refresh_token() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid or expired refresh token".into(),
    ))
}
