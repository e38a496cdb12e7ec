use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{error, warn};

use crate::config::Config;
use crate::dto::{claims_dto::Claims, user_dto::User};
use crate::error::AppError;

/// The acting user, resolved from a `Bearer` token.
pub struct AuthUser(pub Claims);

/// Like `AuthUser`, but anonymous callers and unusable tokens get `None` instead of a rejection.
pub struct MaybeAuthUser(pub Option<Claims>);

pub fn issue_token(user: &User, config: &Config, now: DateTime<Utc>) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.username.clone(),
        uid: user.id,
        exp: (now + config.token_ttl()).timestamp() as usize
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes())
    )
    .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

fn decode_claims(parts: &Parts) -> Result<Option<Claims>, AppError> {
    let Some(auth) = parts.headers.get("Authorization") else {
        return Ok(None);
    };

    let token = auth.to_str().ok()
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

    let config = parts.extensions.get::<Arc<Config>>()
        .ok_or(AppError::Internal("Config extension missing".into()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        error!("Token decoding failed: {:?}", e);
        AppError::Unauthorized("Invalid token".into())
    })?;

    Ok(Some(claims.claims))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        decode_claims(parts)?
            .map(AuthUser)
            .ok_or(AppError::Unauthorized("Missing or invalid Authorization header".into()))
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        match decode_claims(parts) {
            Ok(claims) => Ok(MaybeAuthUser(claims)),
            Err(AppError::Unauthorized(reason)) => {
                warn!("Treating caller as anonymous: {}", reason);
                Ok(MaybeAuthUser(None))
            }
            Err(e) => Err(e),
        }
    }
}
