use std::sync::Arc;

use axum::{
    extract::Extension, routing::{get, post}, Router
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

pub mod config;
pub mod error;

pub mod dto {
    pub mod claims_dto;
    pub mod league_dto;
    pub mod suggestion_dto;
    pub mod user_dto;
}

pub mod routes {
    pub mod leagues;
    pub mod suggestions;
    pub mod users;
}

pub mod services {
    pub mod auth_user;
    pub mod leagues;
    pub mod password;
    pub mod suggestions;
    pub mod users;
    pub mod websocket;
}

use config::Config;
use routes::{leagues, suggestions, users};
use services::websocket::websocket_handler;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub fn build_app(pool: SqlitePool, config: Arc<Config>, tx: broadcast::Sender<String>) -> Router {
    Router::new()
        .route("/users/register", post(users::create_user))
        .route("/users/login", post(users::login_user))
        .route("/users/{user_id}", get(users::get_profile))
        .route("/leagues", get(leagues::get_leagues).post(leagues::create_league))
        .route("/leagues/{league_id}", get(leagues::get_league))
        .route("/leagues/{league_id}/join", post(leagues::join_league))
        .route("/leagues/{league_id}/membership", get(leagues::get_membership).post(leagues::manage_membership))
        .route("/leagues/{league_id}/suggestions", get(suggestions::get_suggestions).post(suggestions::create_suggestion))
        .route("/leagues/{league_id}/approval-sweep", post(suggestions::approval_sweep))
        .route("/suggestions/{suggestion_id}", get(suggestions::get_suggestion))
        .route("/suggestions/{suggestion_id}/vote", post(suggestions::vote))
        .route("/ws", get(websocket_handler))
        .layer(Extension(pool))
        .layer(Extension(config))
        .layer(Extension(tx))
        .layer(CorsLayer::permissive())
}
