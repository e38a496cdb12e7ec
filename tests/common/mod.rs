#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tokio::sync::broadcast;
use tower::ServiceExt;

use league_hub::{
    build_app,
    config::Config,
    dto::{league_dto::CreateLeague, user_dto::CreateUser},
    services::{leagues, users},
    MIGRATOR,
};

pub const PASSWORD: &str = "correct horse";

pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn login(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token in login response").to_string()
}

pub struct TestHarness {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub tx: broadcast::Sender<String>,
}

impl TestHarness {
    /// Fresh in-memory database with the schema applied.
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("valid sqlite url")
            .foreign_keys(true);

        // A single connection that never expires, so the in-memory database lives for the whole test.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("Failed to open in-memory database");

        MIGRATOR.run(&pool).await.expect("Failed to run migrations");

        let config = Arc::new(Config {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
            voting_period_days: 7,
            acceptance_threshold: 3,
        });

        let (tx, _rx) = broadcast::channel(16);

        Self { pool, config, tx }
    }

    pub fn app(&self) -> Router {
        build_app(self.pool.clone(), self.config.clone(), self.tx.clone())
    }

    pub async fn user(&self, username: &str) -> i64 {
        let payload = CreateUser {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        users::register(&self.pool, &payload, Utc::now())
            .await
            .expect("Failed to register user")
            .id
    }

    pub async fn league(&self, creator: i64, name: &str) -> i64 {
        let payload = CreateLeague {
            name: name.to_string(),
            description: String::new(),
        };
        leagues::create_league(&self.pool, creator, &payload, Utc::now())
            .await
            .expect("Failed to create league")
            .league
            .id
    }

    pub async fn join(&self, league_id: i64, user_id: i64) {
        leagues::join_league(&self.pool, league_id, user_id)
            .await
            .expect("Failed to join league");
    }
}
