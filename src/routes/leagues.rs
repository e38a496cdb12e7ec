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

use crate::dto::league_dto::{CreateLeague, LeagueDetail, ManageMembership, Role, RoleFlags};
use crate::error::AppError;
use crate::services::auth_user::{AuthUser, MaybeAuthUser};
use crate::services::leagues;
use crate::services::websocket::send_league_update;

/**
 * GET request to list every league.
 */
pub async fn get_leagues(Extension(pool): Extension<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let leagues = leagues::list_leagues(&pool).await?;
    Ok((StatusCode::OK, Json(leagues)))
}

/**
 * POST request to create a league. The caller becomes its head official.
 */
pub async fn create_league(
    Extension(pool): Extension<SqlitePool>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateLeague>,
) -> Result<impl IntoResponse, AppError> {
    info!("Creating league {} for {}", payload.name, claims.sub);

    let roster = leagues::create_league(&pool, claims.uid, &payload, Utc::now()).await?;
    send_league_update(&tx, &roster);

    Ok((StatusCode::CREATED, Json(roster.league)))
}

/**
 * GET a league with the caller's role flags. Anonymous callers get all flags false.
 */
pub async fn get_league(
    Extension(pool): Extension<SqlitePool>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(league_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let roster = leagues::load_roster(&pool, league_id).await?;
    let roles = claims
        .map(|c| roster.roles_of(c.uid))
        .unwrap_or_default();

    Ok((StatusCode::OK, Json(LeagueDetail { league: roster.league, roles })))
}

pub async fn join_league(
    Extension(pool): Extension<SqlitePool>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let roster = leagues::join_league(&pool, league_id, claims.uid).await?;
    send_league_update(&tx, &roster);

    let roles: RoleFlags = roster.roles_of(claims.uid);
    Ok((StatusCode::OK, Json(LeagueDetail { league: roster.league, roles })))
}

/**
 * GET the head official, officials and members of a league. Head official only.
 */
pub async fn get_membership(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>
) -> Result<impl IntoResponse, AppError> {
    let roster = leagues::require_role(&pool, league_id, claims.uid, Role::HeadOfficial).await?;
    Ok((StatusCode::OK, Json(roster.overview())))
}

/**
 * POST promote/demote changes for a league. Head official only.
 */
pub async fn manage_membership(
    Extension(pool): Extension<SqlitePool>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    AuthUser(claims): AuthUser,
    Path(league_id): Path<i64>,
    Json(payload): Json<ManageMembership>
) -> Result<impl IntoResponse, AppError> {
    info!("{} managing membership of league {}", claims.sub, league_id);

    let roster = leagues::manage_membership(&pool, league_id, claims.uid, &payload.changes).await?;
    send_league_update(&tx, &roster);

    Ok((StatusCode::OK, Json(roster.overview())))
}
