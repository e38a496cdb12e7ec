use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::dto::league_dto::Role;
use crate::dto::suggestion_dto::{
    Ballot, CreateSuggestion, Suggestion, SuggestionDetail, SweepOutcome, VoteDirection,
};
use crate::error::AppError;
use crate::services::leagues::require_role;

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;

fn validate(payload: &CreateSuggestion) -> Result<(), AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("suggestion title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!("suggestion title must be at most {} characters", MAX_TITLE_LEN)));
    }
    if payload.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!("suggestion description must be at most {} characters", MAX_DESCRIPTION_LEN)));
    }
    Ok(())
}

/// Opens a suggestion for voting from `now` until `now + voting_period`.
pub async fn create_suggestion(
    pool: &SqlitePool,
    league_id: i64,
    user_id: i64,
    payload: &CreateSuggestion,
    now: DateTime<Utc>,
    voting_period: Duration,
) -> Result<Suggestion, AppError> {
    require_role(pool, league_id, user_id, Role::Member).await?;
    validate(payload)?;

    let suggestion = sqlx::query_as::<_, Suggestion>(
        r#"
        INSERT INTO suggestions (league_id, suggested_by, title, description, voting_starts, voting_ends, is_accepted, is_achieved)
        VALUES (?, ?, ?, ?, ?, ?, 0, 0)
        RETURNING *
        "#
    )
    .bind(league_id)
    .bind(user_id)
    .bind(payload.title.trim())
    .bind(payload.description.trim())
    .bind(now)
    .bind(now + voting_period)
    .fetch_one(pool)
    .await?;

    info!("User {} suggested {} in league {}", user_id, suggestion.id, league_id);
    Ok(suggestion)
}

pub async fn find_suggestion(pool: &SqlitePool, suggestion_id: i64) -> Result<Suggestion, AppError> {
    sqlx::query_as::<_, Suggestion>("SELECT * FROM suggestions WHERE id = ?")
        .bind(suggestion_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Suggestion {}", suggestion_id)))
}

pub async fn load_ballot(pool: &SqlitePool, suggestion_id: i64) -> Result<Ballot, AppError> {
    let rows = sqlx::query_as::<_, (i64, VoteDirection)>(
        "SELECT user_id, direction FROM suggestion_votes WHERE suggestion_id = ?"
    )
    .bind(suggestion_id)
    .fetch_all(pool)
    .await?;

    Ok(Ballot::from_rows(rows))
}

pub async fn list_suggestions(
    pool: &SqlitePool,
    league_id: i64,
    user_id: i64,
) -> Result<Vec<Suggestion>, AppError> {
    require_role(pool, league_id, user_id, Role::Member).await?;

    Ok(sqlx::query_as::<_, Suggestion>(
        "SELECT * FROM suggestions WHERE league_id = ? ORDER BY voting_starts DESC, id DESC"
    )
    .bind(league_id)
    .fetch_all(pool)
    .await?)
}

pub async fn suggestion_detail(
    pool: &SqlitePool,
    suggestion_id: i64,
    user_id: i64,
) -> Result<SuggestionDetail, AppError> {
    let suggestion = find_suggestion(pool, suggestion_id).await?;
    require_role(pool, suggestion.league_id, user_id, Role::Member).await?;

    let ballot = load_ballot(pool, suggestion_id).await?;
    Ok(SuggestionDetail::new(suggestion, &ballot, user_id))
}

/// Records a member's vote. Casting the other direction replaces the previous
/// vote; repeating the same direction changes nothing.
pub async fn cast_vote(
    pool: &SqlitePool,
    suggestion_id: i64,
    user_id: i64,
    direction: VoteDirection,
    now: DateTime<Utc>,
) -> Result<SuggestionDetail, AppError> {
    let suggestion = find_suggestion(pool, suggestion_id).await?;
    require_role(pool, suggestion.league_id, user_id, Role::Member).await?;

    if suggestion.voting_closed(now) {
        warn!("User {} voting on suggestion {} after voting ended", user_id, suggestion_id);
    }

    let mut ballot = load_ballot(pool, suggestion_id).await?;
    if ballot.cast(user_id, direction) {
        // The (suggestion, user) key holds one row, so switching sides is a single upsert.
        sqlx::query(
            r#"
            INSERT INTO suggestion_votes (suggestion_id, user_id, direction)
            VALUES (?, ?, ?)
            ON CONFLICT(suggestion_id, user_id) DO UPDATE SET
                direction = excluded.direction
            "#
        )
        .bind(suggestion_id)
        .bind(user_id)
        .bind(direction)
        .execute(pool)
        .await?;

        info!("User {} cast {:?} on suggestion {}", user_id, direction, suggestion_id);
    }

    Ok(SuggestionDetail::new(suggestion, &ballot, user_id))
}

/// Accepts every closed, not yet accepted suggestion in the league whose net
/// tally exceeds `threshold`, then returns the accepted but not achieved ones.
pub async fn approval_sweep(
    pool: &SqlitePool,
    league_id: i64,
    acting: i64,
    now: DateTime<Utc>,
    threshold: i64,
) -> Result<SweepOutcome, AppError> {
    require_role(pool, league_id, acting, Role::Official).await?;

    let pending = sqlx::query_as::<_, Suggestion>(
        "SELECT * FROM suggestions WHERE league_id = ? AND is_accepted = 0"
    )
    .bind(league_id)
    .fetch_all(pool)
    .await?;

    let mut accepted = Vec::new();
    for suggestion in pending.iter().filter(|s| s.voting_closed(now)) {
        let ballot = load_ballot(pool, suggestion.id).await?;
        if suggestion.should_accept(&ballot, now, threshold) {
            accepted.push((suggestion.id, ballot.tally()));
        }
    }

    if !accepted.is_empty() {
        let mut tx = pool.begin().await?;
        for &(suggestion_id, tally) in &accepted {
            sqlx::query("UPDATE suggestions SET is_accepted = 1 WHERE id = ?")
                .bind(suggestion_id)
                .execute(&mut *tx)
                .await?;
            info!("Suggestion {} accepted with tally {}", suggestion_id, tally);
        }
        tx.commit().await?;
    }

    let approved = sqlx::query_as::<_, Suggestion>(
        "SELECT * FROM suggestions WHERE league_id = ? AND is_accepted = 1 AND is_achieved = 0 ORDER BY voting_ends"
    )
    .bind(league_id)
    .fetch_all(pool)
    .await?;

    Ok(SweepOutcome {
        newly_accepted: accepted.into_iter().map(|(id, _)| id).collect(),
        approved
    })
}
