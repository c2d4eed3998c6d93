//! Authentication routes
//!
//! Provides endpoints for user registration, login and the current user's
//! profile.

use super::extract::ValidatedJson;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::AuthService;
use crate::state::AppState;
use account_auth_shared::{LoginRequest, RegisterRequest, TokenResponse, UserProfile};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(get_profile))
}

/// Register a new user
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let response = AuthService::from_state(&state).register(req).await?;
    Ok(Json(response))
}

/// Login with email and password
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let response = AuthService::from_state(&state).login(req).await?;
    Ok(Json(response))
}

/// Get current user profile (requires authentication)
///
/// GET /api/v1/auth/me
async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = AuthService::from_state(&state)
        .profile(auth_user.user_id)
        .await?;
    Ok(Json(profile))
}
