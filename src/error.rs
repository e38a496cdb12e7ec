use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::dto::league_dto::Role;

#[derive(Error, Debug)]
pub enum AppError {
    /// The acting user lacks the role an operation requires.
    #[error("You must be {role} of league {league}")]
    Forbidden { role: Role, league: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} was not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Your account is disabled.")]
    AccountDisabled,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn forbidden(role: Role, league: impl Into<String>) -> Self {
        AppError::Forbidden {
            role,
            league: league.into(),
        }
    }

    /// Maps a UNIQUE constraint failure to `Conflict`; any other error stays a database error.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message.into()),
            _ => AppError::Database(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden { .. } | AppError::AccountDisabled => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                "There was a database issue.".to_string()
            }
            AppError::Internal(e) => {
                error!("Internal error: {}", e);
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
