//! Environment-driven configuration

use std::env;
use std::time::Duration;

use anyhow::{bail, Result};

/// Fallback signing secret for local development only. Startup refuses to use
/// it when `APP_ENV=production`.
const DEV_SESSION_SECRET: &str = "restspace-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind host
    pub host: String,

    /// Server bind port
    pub port: u16,

    /// Backend connection string. `postgres://` selects the Postgres backend;
    /// anything else is treated as a SQLite URL. Defaults to a local SQLite
    /// file so development needs no external database.
    pub database_url: String,

    /// WebAuthn relying party id (domain, no scheme or port)
    pub rp_id: String,

    /// WebAuthn expected origin (full URL)
    pub rp_origin: String,

    /// Relying party name shown during passkey creation
    pub rp_name: String,

    /// HS256 signing secret for session tokens
    pub session_secret: String,

    /// Production-like deployment: secure cookies, no secret fallback
    pub production: bool,

    /// Ceremony endpoint rate limit (requests per window per client ip)
    pub rate_limit_max: u32,

    /// Ceremony endpoint rate limit window
    pub rate_limit_window: Duration,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// Fails when `APP_ENV=production` and no `SESSION_SECRET` is supplied:
    /// a deployment signing sessions with the hardcoded default would issue
    /// forgeable tokens.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let production = matches!(
            env::var("APP_ENV").as_deref(),
            Ok("production") | Ok("prod")
        );

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if production => {
                bail!("SESSION_SECRET is required when APP_ENV=production")
            }
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set; using the built-in development secret. \
                     Do not run this configuration outside local development."
                );
                DEV_SESSION_SECRET.to_string()
            }
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| "sqlite://restspace.db?mode=rwc".to_string()),
            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),
            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "restspace".to_string()),
            session_secret,
            production,
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            rate_limit_window: Duration::from_secs(
                env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when the connection string selects the Postgres backend.
    pub fn uses_postgres(&self) -> bool {
        self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://")
    }
}
