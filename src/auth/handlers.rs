use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    auth::{
        dto::TokenResponse,
        extractors::{BearerToken, LoginPayload},
        password::verify_password,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    LoginPayload(payload): LoginPayload,
) -> AppResult<Json<TokenResponse>> {
    let payload = payload.normalized();
    payload.validate()?;
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(anyhow::anyhow!("login fields missing after validation").into());
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let issued = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, jti = %issued.claims.jti, "user logged in");
    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_in_minutes: state.tokens.ttl_minutes(),
    }))
}

#[instrument(skip(state, token))]
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<StatusCode> {
    let claims = state.tokens.invalidate(&token).await.inspect_err(|e| {
        warn!(error = %e, "logout rejected");
    })?;
    info!(user_id = %claims.sub, jti = %claims.jti, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}
