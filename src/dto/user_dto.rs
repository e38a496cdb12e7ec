use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dto::league_dto::League;

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    pub username: String,
    pub password: String
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64
}

/* Leagues a user belongs to, split by role. */
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub official_of: Vec<League>,
    pub member_of: Vec<League>
}
