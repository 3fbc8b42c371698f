//! restspace - anonymous micro-posting with passkey login
//!
//! Short text "thoughts" in a reverse-chronological feed, attributed to
//! anonymous identities established through a WebAuthn ceremony. No
//! registration form, no profiles; identity exists only to attribute and
//! permit editing of posts.

pub mod ceremony;
pub mod config;
pub mod error;
pub mod handlers;
pub mod moderation;
pub mod rate_limit;
pub mod session;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use rate_limit::RateLimiter;
pub use session::SessionIssuer;

use std::sync::Arc;

use anyhow::Context;
use webauthn_rs::prelude::{Url, Webauthn, WebauthnBuilder};

use storage::Storage;

/// Shared application state, cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub webauthn: Arc<Webauthn>,
    pub sessions: Arc<SessionIssuer>,
    pub limiter: RateLimiter,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage = storage::connect(&config)
            .await
            .context("connecting storage backend")?;

        let rp_origin =
            Url::parse(&config.rp_origin).context("RP_ORIGIN is not a valid URL")?;
        let webauthn = WebauthnBuilder::new(&config.rp_id, &rp_origin)
            .context("invalid relying party configuration")?
            .rp_name(&config.rp_name)
            .build()
            .context("building webauthn instance")?;

        Ok(Self {
            storage,
            webauthn: Arc::new(webauthn),
            sessions: Arc::new(SessionIssuer::new(&config.session_secret)),
            limiter: RateLimiter::new(),
            config: Arc::new(config),
        })
    }
}
