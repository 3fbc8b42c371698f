//! WebAuthn ceremony orchestration
//!
//! Both ceremonies share the same challenge lifecycle (Begin upserts a
//! cookie-correlated challenge row, Complete consumes it exactly once) but
//! diverge in identity resolution: registration pre-assigns an anonymous user
//! id at Begin, authentication discovers the user from the credential the
//! client presents at Complete. The stored `purpose` keeps a challenge from
//! being redeemed against the other ceremony.
//!
//! Every Complete failure after the challenge row has been loaded deletes the
//! row: a challenge is single-use whether or not verification succeeds, and a
//! failed attempt always restarts from Begin.

pub mod authentication;
pub mod registration;

use chrono::{Duration, Utc};

use crate::error::{AppError, AppResult};
use crate::storage::{Challenge, ChallengePurpose, Storage};

/// How long a pending challenge stays redeemable. Matches the
/// `challenge_session` cookie max-age.
pub const CHALLENGE_TTL_SECS: i64 = 300;

/// Load the pending challenge for a session and verify it belongs to the
/// expected ceremony and has not aged out. Fails closed: an expired or
/// wrong-purpose row is deleted before the error is returned.
pub(crate) async fn take_challenge(
    storage: &dyn Storage,
    session_id: &str,
    expected: ChallengePurpose,
) -> AppResult<Challenge> {
    let challenge = storage
        .get_challenge(session_id)
        .await?
        .ok_or_else(|| AppError::Sequence("Challenge not found".into()))?;

    let expired =
        Utc::now() - challenge.created_at > Duration::seconds(CHALLENGE_TTL_SECS);
    if expired || challenge.purpose() != Some(expected) {
        storage.delete_challenge(session_id).await?;
        return Err(AppError::Sequence("Challenge not found".into()));
    }

    Ok(challenge)
}

/// Consume the challenge and turn a verification failure into the
/// client-facing rejection.
pub(crate) async fn reject_attempt(
    storage: &dyn Storage,
    session_id: &str,
    reason: AppError,
) -> AppError {
    if let Err(e) = storage.delete_challenge(session_id).await {
        tracing::error!("failed to delete consumed challenge: {e}");
    }
    reason
}
