use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::dto::league_dto::{
    CreateLeague, League, LeagueRoster, MembershipAction, MembershipChange, Role,
};
use crate::error::AppError;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

fn validate(payload: &CreateLeague) -> Result<(), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("league name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!("league name must be at most {} characters", MAX_NAME_LEN)));
    }
    if payload.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!("league description must be at most {} characters", MAX_DESCRIPTION_LEN)));
    }
    Ok(())
}

/// Creates a league owned by `creator`, who is also added to its officials and members.
pub async fn create_league(
    pool: &SqlitePool,
    creator: i64,
    payload: &CreateLeague,
    now: DateTime<Utc>,
) -> Result<LeagueRoster, AppError> {
    validate(payload)?;
    let name = payload.name.trim();

    let mut tx = pool.begin().await?;

    // leagues.name is UNIQUE; a concurrent duplicate fails here as a Conflict.
    let league = sqlx::query_as::<_, League>(
        r#"
        INSERT INTO leagues (name, description, head_official_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#
    )
    .bind(name)
    .bind(payload.description.trim())
    .bind(creator)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, format!("A league named {} already exists", name)))?;

    sqlx::query("INSERT INTO league_officials (league_id, user_id) VALUES (?, ?)")
        .bind(league.id)
        .bind(creator)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO league_members (league_id, user_id) VALUES (?, ?)")
        .bind(league.id)
        .bind(creator)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("User {} created league {} ({})", creator, league.name, league.id);
    load_roster(pool, league.id).await
}

pub async fn list_leagues(pool: &SqlitePool) -> Result<Vec<League>, AppError> {
    Ok(sqlx::query_as::<_, League>("SELECT * FROM leagues ORDER BY name")
        .fetch_all(pool)
        .await?)
}

pub async fn find_league(pool: &SqlitePool, league_id: i64) -> Result<League, AppError> {
    sqlx::query_as::<_, League>("SELECT * FROM leagues WHERE id = ?")
        .bind(league_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("League {}", league_id)))
}

pub async fn load_roster(pool: &SqlitePool, league_id: i64) -> Result<LeagueRoster, AppError> {
    let league = find_league(pool, league_id).await?;

    let officials: BTreeSet<i64> = sqlx::query_scalar::<_, i64>("SELECT user_id FROM league_officials WHERE league_id = ?")
        .bind(league_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    let members: BTreeSet<i64> = sqlx::query_scalar::<_, i64>("SELECT user_id FROM league_members WHERE league_id = ?")
        .bind(league_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    Ok(LeagueRoster { league, officials, members })
}

/// Loads the roster and rejects `user_id` unless it holds `role`.
pub async fn require_role(
    pool: &SqlitePool,
    league_id: i64,
    user_id: i64,
    role: Role,
) -> Result<LeagueRoster, AppError> {
    let roster = load_roster(pool, league_id).await?;
    if !roster.has_role(user_id, role) {
        warn!("User {} rejected: not {} of league {}", user_id, role, roster.league.name);
        return Err(AppError::forbidden(role, roster.league.name.clone()));
    }
    Ok(roster)
}

pub async fn join_league(
    pool: &SqlitePool,
    league_id: i64,
    user_id: i64,
) -> Result<LeagueRoster, AppError> {
    find_league(pool, league_id).await?;

    sqlx::query("INSERT OR IGNORE INTO league_members (league_id, user_id) VALUES (?, ?)")
        .bind(league_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    info!("User {} joined league {}", user_id, league_id);
    load_roster(pool, league_id).await
}

/// Applies promote/demote changes to the officials set. Only the head official may call this.
///
/// Promotion does not require membership and demotion leaves membership untouched.
pub async fn manage_membership(
    pool: &SqlitePool,
    league_id: i64,
    acting: i64,
    changes: &[MembershipChange],
) -> Result<LeagueRoster, AppError> {
    require_role(pool, league_id, acting, Role::HeadOfficial).await?;

    if changes.is_empty() {
        return Err(AppError::Validation("no membership changes supplied".into()));
    }

    for change in changes {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?")
            .bind(change.user_id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::Validation(format!("user {} does not exist", change.user_id)));
        }
    }

    let mut tx = pool.begin().await?;
    for change in changes {
        match change.action {
            MembershipAction::Promote => {
                sqlx::query("INSERT OR IGNORE INTO league_officials (league_id, user_id) VALUES (?, ?)")
                    .bind(league_id)
                    .bind(change.user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            MembershipAction::Demote => {
                sqlx::query("DELETE FROM league_officials WHERE league_id = ? AND user_id = ?")
                    .bind(league_id)
                    .bind(change.user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        info!("League {}: {:?} user {}", league_id, change.action, change.user_id);
    }
    tx.commit().await?;

    load_roster(pool, league_id).await
}
