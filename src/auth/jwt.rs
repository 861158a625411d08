use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{blacklist::TokenBlacklist, claims::Claims};
use crate::{clock::Clock, config::JwtConfig, error::AppResult, state::AppState};

/// Why a bearer token was refused. Every variant ends up as a 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token not provided")]
    Missing,
    #[error("Wrong number of segments")]
    Malformed,
    #[error("Could not decode token: {0}")]
    Undecodable(String),
    #[error("Token Signature could not be verified")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
    #[error("The token has been blacklisted")]
    Revoked,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidToken => TokenError::Malformed,
            ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => TokenError::Undecodable(e.to_string()),
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues, validates and revokes HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    blacklist: Arc<dyn TokenBlacklist>,
    clock: Arc<dyn Clock>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenService {
    pub fn new(cfg: &JwtConfig, blacklist: Arc<dyn TokenBlacklist>, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            blacklist,
            clock,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.whole_minutes()
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<IssuedToken> {
        let now = self.clock.now();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("encode jwt")?;
        debug!(user_id = %user_id, jti = %claims.jti, "jwt signed");
        Ok(IssuedToken { token, claims })
    }

    /// Structural, signature and expiry checks. Does not consult the blacklist.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        // Expiry is judged against the injected clock below.
        validation.validate_exp = false;

        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        if claims.exp <= self.clock.now().unix_timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    pub async fn validate(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if self.blacklist.is_revoked(claims.jti).await? {
            return Err(TokenError::Revoked.into());
        }
        debug!(user_id = %claims.sub, jti = %claims.jti, "jwt verified");
        Ok(claims)
    }

    /// Revokes `token`. A token can be invalidated once.
    pub async fn invalidate(&self, token: &str) -> AppResult<Claims> {
        let claims = self.validate(token).await?;
        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).context("token expiry out of range")?;
        if !self.blacklist.revoke(claims.jti, expires_at).await? {
            return Err(TokenError::Revoked.into());
        }
        Ok(claims)
    }
}
