use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::dto::league_dto::League;
use crate::dto::user_dto::{CreateUser, LoginUser, User, UserProfile};
use crate::error::AppError;
use crate::services::password::{hash_password, verify_password};

pub async fn register(
    pool: &SqlitePool,
    payload: &CreateUser,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    /* Duplicate usernames are caught by the UNIQUE constraint */
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, first_name, last_name, password_hash, is_active, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        RETURNING *
        "#
    )
    .bind(username)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(hash_password(&payload.password))
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "That username already exists"))?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Checks credentials and returns the matching active account.
pub async fn authenticate(pool: &SqlitePool, payload: &LoginUser) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(payload.username.trim())
        .fetch_optional(pool)
        .await?;

    let Some(user) = user.filter(|u| verify_password(&payload.password, &u.password_hash)) else {
        warn!("Invalid login details for {}", payload.username);
        return Err(AppError::Unauthorized("Invalid login details supplied.".into()));
    };

    if !user.is_active {
        warn!("Login attempt on disabled account {}", user.username);
        return Err(AppError::AccountDisabled);
    }

    Ok(user)
}

pub async fn find_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
}

pub async fn profile(pool: &SqlitePool, user_id: i64) -> Result<UserProfile, AppError> {
    let user = find_user(pool, user_id).await?;

    let official_of = sqlx::query_as::<_, League>(
        r#"
        SELECT l.* FROM leagues l
        JOIN league_officials o ON o.league_id = l.id
        WHERE o.user_id = ?
        ORDER BY l.name
        "#
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let member_of = sqlx::query_as::<_, League>(
        r#"
        SELECT l.* FROM leagues l
        JOIN league_members m ON m.league_id = l.id
        WHERE m.user_id = ?
        ORDER BY l.name
        "#
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .filter(|league| !official_of.iter().any(|o| o.id == league.id))
    .collect();

    Ok(UserProfile { user, official_of, member_of })
}
