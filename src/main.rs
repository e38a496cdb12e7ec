use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::info;

use league_hub::{build_app, config::Config, MIGRATOR};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL is not a valid sqlite url")?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Could not connect to SQLite")?;

    info!("Connected to sqlite database.");

    MIGRATOR.run(&pool).await.context("Failed to run migrations")?;
    info!("Migrations complete.");

    let (tx, _rx) = broadcast::channel::<String>(100);
    let app = build_app(pool, config.clone(), tx);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    info!("Started server on {}.", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
