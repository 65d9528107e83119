use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::api::response::{ApiResponse, created, ok};
use crate::api::validation::Validator;
use crate::auth::jwt::{TokenType, generate_access_token, generate_refresh_token, verify_token};
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::{
    role::Role,
    user::{NewUser, User, UserProfile},
};
use crate::repository::StorageError;
use crate::service::employee::normalize_email;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_REGISTERED: &str = "User with this email already exists";

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    #[schema(example = "admin@hrms.com", format = "email")]
    pub email: String,
    #[schema(example = "admin123")]
    pub password: String,
    #[schema(example = "Admin User")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[schema(example = "admin@hrms.com", format = "email")]
    pub email: String,
    #[schema(example = "admin123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPayload {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

fn internal(context: &'static str) -> impl FnOnce(jsonwebtoken::errors::Error) -> AppError {
    move |e| AppError::Internal(format!("{context}: {e}"))
}

/// Issues an access/refresh pair and records the refresh token id.
async fn issue_tokens(state: &AppState, config: &Config, user_id: u64, email: &str, role: Role) -> AppResult<TokenPair> {
    let access_token = generate_access_token(user_id, email, role, &config.jwt_secret, config.access_token_ttl)
        .map_err(internal("Failed to sign access token"))?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(user_id, email, role, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(internal("Failed to sign refresh token"))?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");
    state
        .users
        .store_refresh_token(user_id, &refresh_claims.jti, refresh_claims.expires_at())
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = Object, example = json!({
            "success": true,
            "message": "User created successfully",
            "data": {
                "access_token": "eyJ...", "refresh_token": "eyJ...",
                "user": {"id": 1, "email": "admin@hrms.com", "name": "Admin User", "role": "employee"}
            }
        })),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "User with this email already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, config, payload))]
pub async fn register(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();
    v.email(&body.email, "email");
    v.password(&body.password, "password");
    v.person_name(&body.name, "name", "Name", 100);
    v.finish()?;

    let email = normalize_email(&body.email);
    if !state.emails.is_available(&email, state.users.as_ref()).await? {
        info!("Registration rejected: email taken");
        return Err(AppError::conflict(EMAIL_REGISTERED));
    }

    let password = hash_password(&body.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let user = NewUser {
        email: email.clone(),
        password,
        name: body.name.trim().to_string(),
        role: Role::default(),
    };
    let id = state.users.insert(&user).await.map_err(|e| match e {
        StorageError::UniqueViolation { .. } => AppError::conflict(EMAIL_REGISTERED),
        other => AppError::Storage(other),
    })?;
    state.emails.mark_taken(&email).await;

    let tokens = issue_tokens(&state, &config, id, &email, user.role).await?;
    let profile = UserProfile {
        id,
        email,
        name: user.name,
        role: user.role,
    };

    info!(user_id = id, "User registered");
    Ok(created(
        ApiResponse::data(AuthPayload { tokens, user: profile }).with_message("User created successfully"),
    ))
}

/// Log in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Invalid email or password", body = Object, example = json!({
            "success": false, "error": "Unauthorized", "message": "Invalid email or password"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, payload))]
pub async fn login(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();
    v.email(&body.email, "email");
    v.check(!body.password.is_empty(), "password", "Password is required");
    v.finish()?;

    let user: User = match state.users.find_by_email(&normalize_email(&body.email)).await? {
        Some(user) => user,
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(user_id = user.id, error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let tokens = issue_tokens(&state, &config, user.id, &user.email, user.role).await?;

    info!(user_id = user.id, "Login successful");
    Ok(ok(ApiResponse::data(AuthPayload {
        tokens,
        user: UserProfile::from(&user),
    })
    .with_message("Login successful")))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair; the presented refresh token is revoked"),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let unauthorized = || AppError::Unauthorized("Invalid refresh token".into());

    let token = bearer(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    // Single use: a token that was already rotated or logged out is refused.
    let user_id = state
        .users
        .revoke_refresh_token(&claims.jti)
        .await?
        .ok_or_else(unauthorized)?;

    let tokens = issue_tokens(&state, &config, user_id, &claims.sub, claims.role).await?;

    debug!(user_id, "Refresh token rotated");
    Ok(ok(ApiResponse::data(tokens)))
}

/// Log out
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = bearer(&req).and_then(|token| verify_token(token, &config.jwt_secret).ok());

    if let Some(claims) = claims.filter(|c| c.token_type == TokenType::Refresh) {
        state.users.revoke_refresh_token(&claims.jti).await?;
        debug!(user_id = claims.user_id, "Refresh token revoked");
    }

    Ok(HttpResponse::NoContent().finish())
}
