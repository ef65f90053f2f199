// handlers/auth.rs - /api/auth/* handlers
//
// sign-in, sign-up, validate-token and set-password are reachable without a
// session; send-invite and sign-out sit behind the session gate.

use axum::extract::State;
use serde::Serialize;
use serde_json::{json, Value};

use super::AppState;
use crate::auth::{clear_session_cookie, session_cookie};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::account_service::{
    InviteRequest, SetPasswordRequest, SignInRequest, SignUpRequest, TokenRequest,
};
use crate::services::AuthError;

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub user: User,
    pub token: String,
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignInRequest>,
) -> ApiResult<SessionData> {
    let signed_in = state.accounts.sign_in(input).await?;
    let cookie = session_cookie(
        &signed_in.token,
        state.config.security.session_cookie_max_age_days,
        state.config.security.secure_cookies,
    );
    Ok(ApiResponse::success(SessionData {
        user: signed_in.user,
        token: signed_in.token,
    })
    .with_cookie(cookie))
}

/// POST /api/auth/sign-up
pub async fn sign_up(State(state): State<AppState>, JsonBody(input): JsonBody<SignUpRequest>) -> ApiResult<User> {
    Ok(ApiResponse::created(state.accounts.sign_up(input).await?))
}

/// POST /api/auth/send-invite
pub async fn send_invite(State(state): State<AppState>, JsonBody(input): JsonBody<InviteRequest>) -> ApiResult<Value> {
    let user = state.accounts.send_invite(input).await?;
    Ok(ApiResponse::success(json!({
        "message": "Invitation sent",
        "user": user
    })))
}

/// POST /api/auth/validate-token
pub async fn validate_token(State(state): State<AppState>, JsonBody(input): JsonBody<TokenRequest>) -> ApiResult<User> {
    let token = input
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(ApiError::from(AuthError::InvalidToken))?;
    Ok(ApiResponse::success(state.accounts.validate_token(token.trim()).await?))
}

/// PATCH /api/auth/set-password
pub async fn set_password(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SetPasswordRequest>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.accounts.set_password(input).await?))
}

/// POST /api/auth/sign-out
pub async fn sign_out(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "signedOut": true }))
        .with_cookie(clear_session_cookie(state.config.security.secure_cookies)))
}
