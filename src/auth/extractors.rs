use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        StatusCode,
    },
    Form,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    dto::LoginRequest,
    jwt::{TokenError, TokenService},
};
use crate::error::AppError;

/// Login fields from a JSON or urlencoded form body. A body that can't be
/// read as either yields empty fields, so validation reports what is missing.
pub struct LoginPayload(pub LoginRequest);

#[async_trait]
impl<S> FromRequest<S> for LoginPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            return Ok(match Form::<LoginRequest>::from_request(req, state).await {
                Ok(Form(payload)) => LoginPayload(payload),
                Err(e) => {
                    debug!(error = %e, "unreadable login form");
                    LoginPayload(LoginRequest::default())
                }
            });
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
                _ => AppError::BadRequest(e.body_text()),
            })?;
        let value = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or_else(|e| {
            if !body.is_empty() {
                debug!(error = %e, "unreadable login json");
            }
            serde_json::Value::Null
        });
        Ok(LoginPayload(LoginRequest::from_json(&value)))
    }
}

/// The raw token from `Authorization: Bearer <token>`, not yet validated.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(TokenError::Missing)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(TokenError::Missing)?;

        Ok(BearerToken(token.trim().to_string()))
    }
}

/// Validates the bearer token and yields the user ID it was issued to.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let tokens = TokenService::from_ref(state);
        let claims = tokens.validate(&token).await.inspect_err(|e| {
            warn!(error = %e, "bearer token rejected");
        })?;
        Ok(AuthUser(claims.sub))
    }
}
