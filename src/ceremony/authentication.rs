//! Authentication ceremony: prove possession of a registered passkey
//!
//! Discoverable flow: Begin issues options without naming any credential, and
//! Complete resolves the user from whichever credential the client presents.

use base64::prelude::*;
use webauthn_rs::prelude::*;

use crate::error::{AppError, AppResult};
use crate::storage::ChallengePurpose;
use crate::AppState;

use super::{reject_attempt, take_challenge};

pub struct AuthenticationBegin {
    pub options: RequestChallengeResponse,
    pub session_id: String,
}

/// Begin: generate request options and persist a challenge with no associated
/// user. Identity is discovered at Complete time.
pub async fn begin(
    state: &AppState,
    session_id: Option<String>,
) -> AppResult<AuthenticationBegin> {
    let (options, auth_state) = state
        .webauthn
        .start_discoverable_authentication()
        .map_err(|e| AppError::Internal(format!("authentication options: {e}")))?;

    let state_json = serde_json::to_string(&auth_state)
        .map_err(|e| AppError::Internal(format!("serialize authentication state: {e}")))?;

    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    state
        .storage
        .save_challenge(
            &session_id,
            ChallengePurpose::Authenticate,
            &state_json,
            None,
        )
        .await?;

    Ok(AuthenticationBegin {
        options,
        session_id,
    })
}

/// Complete: look up the presented credential, verify the assertion against
/// the stored key and challenge, and advance the signature counter through
/// the guarded write. A counter that fails to advance is treated as a cloned
/// authenticator replay and rejected. Returns the authenticated user id.
pub async fn complete(
    state: &AppState,
    session_id: &str,
    credential: &PublicKeyCredential,
) -> AppResult<String> {
    let challenge = take_challenge(
        state.storage.as_ref(),
        session_id,
        ChallengePurpose::Authenticate,
    )
    .await?;

    let storage = state.storage.as_ref();

    // Credential lookup comes before any cryptography: an unknown id is a
    // cheap, expected failure.
    let credential_id = BASE64_URL_SAFE_NO_PAD.encode(credential.raw_id.as_ref());
    let Some(authenticator) = storage.authenticator_by_credential_id(&credential_id).await? else {
        return Err(reject_attempt(
            storage,
            session_id,
            AppError::Credential("Authenticator not found".into()),
        )
        .await);
    };

    let auth_state: DiscoverableAuthentication = match serde_json::from_str(&challenge.state) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("corrupt authentication state for session: {e}");
            return Err(reject_attempt(
                storage,
                session_id,
                AppError::Sequence("Challenge not found".into()),
            )
            .await);
        }
    };

    let mut passkey: Passkey = match serde_json::from_str(&authenticator.public_key) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("corrupt stored credential {credential_id}: {e}");
            return Err(reject_attempt(
                storage,
                session_id,
                AppError::Credential("Verification failed".into()),
            )
            .await);
        }
    };

    let keys = [DiscoverableKey::from(&passkey)];
    let result = match state
        .webauthn
        .finish_discoverable_authentication(credential, auth_state, &keys)
    {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!("authentication verification failed: {e}");
            return Err(reject_attempt(
                storage,
                session_id,
                AppError::Credential("Verification failed".into()),
            )
            .await);
        }
    };

    let _ = passkey.update_credential(&result);
    let public_key = serde_json::to_string(&passkey)
        .map_err(|e| AppError::Internal(format!("serialize passkey: {e}")))?;

    // The guarded write is the replay backstop: an assertion reusing an old
    // counter matches no row and must not mint a session.
    let advanced = storage
        .update_counter(&credential_id, &public_key, i64::from(result.counter()))
        .await?;
    if !advanced {
        tracing::warn!("signature counter did not advance for {credential_id}; possible cloned authenticator");
        return Err(reject_attempt(
            storage,
            session_id,
            AppError::Credential("Verification failed".into()),
        )
        .await);
    }

    storage.delete_challenge(session_id).await?;

    Ok(authenticator.user_id)
}
