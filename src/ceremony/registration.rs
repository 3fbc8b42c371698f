//! Registration ceremony: create an anonymous identity and its first passkey

use base64::prelude::*;
use uuid::Uuid;
use webauthn_rs::prelude::*;

use crate::error::{AppError, AppResult};
use crate::storage::{ChallengePurpose, NewAuthenticator};
use crate::AppState;

use super::take_challenge;

pub struct RegistrationBegin {
    pub options: CreationChallengeResponse,
    /// Correlation token for the `challenge_session` cookie.
    pub session_id: String,
}

/// Begin: mint a fresh anonymous user, generate creation options, and bind
/// the challenge to both the session and the pending user id.
pub async fn begin(state: &AppState, session_id: Option<String>) -> AppResult<RegistrationBegin> {
    let user_uuid = Uuid::new_v4();
    let user_id = user_uuid.to_string();
    state.storage.create_user(&user_id).await?;

    // A brand-new user has no credentials, but building the exclusion list
    // from storage keeps Begin correct if that ever changes.
    let existing = state.storage.authenticators_for_user(&user_id).await?;
    let exclude: Vec<CredentialID> = existing
        .iter()
        .filter_map(|auth| serde_json::from_str::<Passkey>(&auth.public_key).ok())
        .map(|passkey| passkey.cred_id().clone())
        .collect();
    let exclude = (!exclude.is_empty()).then_some(exclude);

    let display_name = format!("anon-{}", &user_id[..8]);
    let (options, reg_state) = state
        .webauthn
        .start_passkey_registration(user_uuid, &display_name, &display_name, exclude)
        .map_err(|e| AppError::Internal(format!("registration options: {e}")))?;

    let state_json = serde_json::to_string(&reg_state)
        .map_err(|e| AppError::Internal(format!("serialize registration state: {e}")))?;

    // Reuse the caller's existing correlation token so a restarted Begin
    // overwrites the stale challenge instead of orphaning it.
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    state
        .storage
        .save_challenge(
            &session_id,
            ChallengePurpose::Register,
            &state_json,
            Some(&user_id),
        )
        .await?;

    Ok(RegistrationBegin {
        options,
        session_id,
    })
}

/// Complete: verify the attestation against the stored challenge and persist
/// the new authenticator under the challenge's pending user id. Returns the
/// user id a session should be issued for.
pub async fn complete(
    state: &AppState,
    session_id: &str,
    credential: &RegisterPublicKeyCredential,
) -> AppResult<String> {
    let challenge = take_challenge(
        state.storage.as_ref(),
        session_id,
        ChallengePurpose::Register,
    )
    .await?;

    let storage = state.storage.as_ref();

    let Some(user_id) = challenge.user_id.clone() else {
        return Err(super::reject_attempt(
            storage,
            session_id,
            AppError::Sequence("Challenge not found".into()),
        )
        .await);
    };

    let reg_state: PasskeyRegistration = match serde_json::from_str(&challenge.state) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("corrupt registration state for session: {e}");
            return Err(super::reject_attempt(
                storage,
                session_id,
                AppError::Sequence("Challenge not found".into()),
            )
            .await);
        }
    };

    let passkey = match state.webauthn.finish_passkey_registration(credential, &reg_state) {
        Ok(passkey) => passkey,
        Err(e) => {
            tracing::debug!("registration verification failed: {e}");
            return Err(super::reject_attempt(
                storage,
                session_id,
                AppError::Credential("Verification failed".into()),
            )
            .await);
        }
    };

    let credential_id = BASE64_URL_SAFE_NO_PAD.encode(passkey.cred_id().as_ref());
    let public_key = serde_json::to_string(&passkey)
        .map_err(|e| AppError::Internal(format!("serialize passkey: {e}")))?;
    let transports = credential
        .response
        .transports
        .as_ref()
        .map(|t| serde_json::to_string(t))
        .transpose()
        .map_err(|e| AppError::Internal(format!("serialize transports: {e}")))?;

    storage
        .save_authenticator(NewAuthenticator {
            id: &Uuid::new_v4().to_string(),
            user_id: &user_id,
            credential_id: &credential_id,
            public_key: &public_key,
            counter: 0,
            transports: transports.as_deref(),
        })
        .await?;

    storage.delete_challenge(session_id).await?;

    Ok(user_id)
}
