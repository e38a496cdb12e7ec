use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::dto::user_dto::{CreateUser, LoginResponse, LoginUser};
use crate::error::AppError;
use crate::services::auth_user::{issue_token, AuthUser};
use crate::services::users;

/* POST to register a new account */
pub async fn create_user(
    Extension(pool): Extension<SqlitePool>,
    Json(payload): Json<CreateUser>
) -> Result<impl IntoResponse, AppError> {
    info!("Registering user {}", payload.username);
    let user = users::register(&pool, &payload, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/* POST to login the user */
pub async fn login_user(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Arc<Config>>,
    Json(payload): Json<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::authenticate(&pool, &payload).await?;
    let token = issue_token(&user, &config, Utc::now())?;

    info!("User {} logged in.", user.username);
    Ok((StatusCode::OK, Json(LoginResponse { token, user_id: user.id })))
}

/**
 * GET a user's profile with the leagues they officiate and belong to.
 */
pub async fn get_profile(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(_claims): AuthUser,
    Path(user_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let profile = users::profile(&pool, user_id).await?;

    Ok((StatusCode::OK, Json(profile)))
}
