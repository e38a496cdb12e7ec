use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::Config;
use crate::dto::suggestion_dto::{CastVote, CreateSuggestion};
use crate::error::AppError;
use crate::services::auth_user::AuthUser;
use crate::services::suggestions;
use crate::services::websocket::send_suggestion_update;

/**
 * GET the suggestions of a league. Members only.
 */
pub async fn get_suggestions(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let suggestions = suggestions::list_suggestions(&pool, league_id, claims.uid).await?;
    Ok((StatusCode::OK, Json(suggestions)))
}

/**
 * POST a new suggestion to a league. Members only.
 */
pub async fn create_suggestion(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Arc<Config>>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>,
    Json(payload): Json<CreateSuggestion>
) -> Result<impl IntoResponse, AppError> {
    info!("{} suggesting {} in league {}", claims.sub, payload.title, league_id);

    let suggestion = suggestions::create_suggestion(
        &pool,
        league_id,
        claims.uid,
        &payload,
        Utc::now(),
        config.voting_period()
    ).await?;
    send_suggestion_update(&pool, &tx, &suggestion).await;

    Ok((StatusCode::CREATED, Json(suggestion)))
}

pub async fn get_suggestion(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(claims): AuthUser,
    Path(suggestion_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let detail = suggestions::suggestion_detail(&pool, suggestion_id, claims.uid).await?;
    Ok((StatusCode::OK, Json(detail)))
}

/**
 * POST an upvote or downvote. Members of the suggestion's league only.
 */
pub async fn vote(
    Extension(pool): Extension<SqlitePool>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Path(suggestion_id): Path<i64>,
    Json(payload): Json<CastVote>
) -> Result<impl IntoResponse, AppError> {
    let detail = suggestions::cast_vote(&pool, suggestion_id, claims.uid, payload.direction, Utc::now()).await?;
    send_suggestion_update(&pool, &tx, &detail.suggestion).await;

    Ok((StatusCode::OK, Json(detail)))
}

/**
 * POST to run the approval sweep over a league's closed suggestions. Officials only.
 * Responds with the accepted suggestions that are not yet achieved and
 * broadcasts only the ones this sweep accepted.
 */
pub async fn approval_sweep(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Arc<Config>>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    info!("{} running approval sweep for league {}", claims.sub, league_id);

    let outcome = suggestions::approval_sweep(
        &pool,
        league_id,
        claims.uid,
        Utc::now(),
        config.acceptance_threshold
    ).await?;

    for suggestion in outcome.newly_accepted() {
        send_suggestion_update(&pool, &tx, suggestion).await;
    }

    Ok((StatusCode::OK, Json(outcome.approved)))
}
