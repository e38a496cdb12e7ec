use anyhow::{ensure, Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;

const MAX_VOTING_PERIOD_DAYS: i64 = 3650;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Runtime configuration, read from the environment (and `.env` in development).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// How long a suggestion stays open for voting after it is created.
    pub voting_period_days: i64,
    /// A closed suggestion is accepted once its net tally is strictly greater than this.
    pub acceptance_threshold: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/league_hub.db".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("TOKEN_TTL_HOURS must be a valid number")?,
            voting_period_days: env::var("VOTING_PERIOD_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("VOTING_PERIOD_DAYS must be a valid number")?,
            acceptance_threshold: env::var("ACCEPTANCE_THRESHOLD")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("ACCEPTANCE_THRESHOLD must be a valid number")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects durations that are non-positive or too large for date arithmetic.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_VOTING_PERIOD_DAYS).contains(&self.voting_period_days),
            "VOTING_PERIOD_DAYS must be between 1 and {}",
            MAX_VOTING_PERIOD_DAYS
        );
        ensure!(
            (1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours),
            "TOKEN_TTL_HOURS must be between 1 and {}",
            MAX_TOKEN_TTL_HOURS
        );
        ensure!(!self.jwt_secret.is_empty(), "JWT_SECRET must not be empty");
        Ok(())
    }

    pub fn voting_period(&self) -> Duration {
        Duration::days(self.voting_period_days)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(voting_period_days: i64, token_ttl_hours: i64) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            port: 3000,
            jwt_secret: "secret".to_string(),
            token_ttl_hours,
            voting_period_days,
            acceptance_threshold: 3,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(config(7, 24).validate().is_ok());
        assert_eq!(config(7, 24).voting_period(), Duration::days(7));
    }

    #[test]
    fn out_of_range_voting_period_is_rejected() {
        assert!(config(0, 24).validate().is_err());
        assert!(config(-5, 24).validate().is_err());
        assert!(config(10_000_000_000_000, 24).validate().is_err());
        assert!(config(MAX_VOTING_PERIOD_DAYS, 24).validate().is_ok());
    }

    #[test]
    fn out_of_range_token_ttl_is_rejected() {
        assert!(config(7, 0).validate().is_err());
        assert!(config(7, i64::MAX).validate().is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = config(7, 24);
        config.jwt_secret.clear();
        assert!(config.validate().is_err());
    }
}
