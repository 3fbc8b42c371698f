//! Storage contract tests against the SQLite backend

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use restspace::storage::{
    ChallengePurpose, NewAuthenticator, NewThought, SqliteStorage, Storage, StorageError,
};

async fn store() -> SqliteStorage {
    SqliteStorage::in_memory().await.unwrap()
}

fn sample_authenticator<'a>(id: &'a str, user_id: &'a str, credential_id: &'a str) -> NewAuthenticator<'a> {
    NewAuthenticator {
        id,
        user_id,
        credential_id,
        public_key: "{}",
        counter: 0,
        transports: None,
    }
}

#[tokio::test]
async fn challenge_upsert_keeps_one_row_per_session() {
    let store = store().await;

    store
        .save_challenge("sess-1", ChallengePurpose::Register, "state-a", Some("u1"))
        .await
        .unwrap();
    store
        .save_challenge("sess-1", ChallengePurpose::Authenticate, "state-b", None)
        .await
        .unwrap();

    let challenge = store.get_challenge("sess-1").await.unwrap().unwrap();
    assert_eq!(challenge.state, "state-b");
    assert_eq!(challenge.purpose(), Some(ChallengePurpose::Authenticate));
    assert_eq!(challenge.user_id, None);
}

#[tokio::test]
async fn deleted_challenge_is_gone() {
    let store = store().await;

    store
        .save_challenge("sess-1", ChallengePurpose::Register, "state", Some("u1"))
        .await
        .unwrap();
    store.delete_challenge("sess-1").await.unwrap();

    assert!(store.get_challenge("sess-1").await.unwrap().is_none());
}

#[tokio::test]
async fn sweep_removes_only_old_challenges() {
    let store = store().await;

    store
        .save_challenge("fresh", ChallengePurpose::Register, "state", None)
        .await
        .unwrap();

    // Nothing is older than the cutoff yet.
    let removed = store
        .delete_challenges_before(Utc::now() - Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(removed, 0);

    // Everything is older than a future cutoff.
    let removed = store
        .delete_challenges_before(Utc::now() + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.get_challenge("fresh").await.unwrap().is_none());
}

#[tokio::test]
async fn create_user_is_idempotent() {
    let store = store().await;

    store.create_user("u1").await.unwrap();
    store.create_user("u1").await.unwrap();
}

#[tokio::test]
async fn duplicate_credential_id_is_a_uniqueness_violation() {
    let store = store().await;
    store.create_user("u1").await.unwrap();
    store.create_user("u2").await.unwrap();

    store
        .save_authenticator(sample_authenticator("a1", "u1", "cred-1"))
        .await
        .unwrap();

    let err = store
        .save_authenticator(sample_authenticator("a2", "u2", "cred-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UniquenessViolation));
}

#[tokio::test]
async fn authenticator_lookups() {
    let store = store().await;
    store.create_user("u1").await.unwrap();

    store
        .save_authenticator(sample_authenticator("a1", "u1", "cred-1"))
        .await
        .unwrap();
    store
        .save_authenticator(sample_authenticator("a2", "u1", "cred-2"))
        .await
        .unwrap();

    let for_user = store.authenticators_for_user("u1").await.unwrap();
    assert_eq!(for_user.len(), 2);

    let by_cred = store
        .authenticator_by_credential_id("cred-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_cred.user_id, "u1");

    assert!(store
        .authenticator_by_credential_id("cred-missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn counter_guard_rejects_replays_and_accepts_advances() {
    let store = store().await;
    store.create_user("u1").await.unwrap();

    let mut auth = sample_authenticator("a1", "u1", "cred-1");
    auth.counter = 5;
    store.save_authenticator(auth).await.unwrap();

    // Equal or lower counters are replays.
    assert!(!store.update_counter("cred-1", "{}", 5).await.unwrap());
    assert!(!store.update_counter("cred-1", "{}", 3).await.unwrap());

    // A strict advance lands and persists.
    assert!(store.update_counter("cred-1", "{}", 6).await.unwrap());
    let row = store
        .authenticator_by_credential_id("cred-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.counter, 6);

    // And the old value is now a replay.
    assert!(!store.update_counter("cred-1", "{}", 6).await.unwrap());
}

#[tokio::test]
async fn counter_guard_allows_the_zero_zero_case() {
    let store = store().await;
    store.create_user("u1").await.unwrap();

    store
        .save_authenticator(sample_authenticator("a1", "u1", "cred-1"))
        .await
        .unwrap();

    // Authenticators that never increment always report zero.
    assert!(store.update_counter("cred-1", "{}", 0).await.unwrap());
    assert!(store.update_counter("cred-1", "{}", 0).await.unwrap());
}

#[tokio::test]
async fn feed_is_reverse_chronological_with_cursor() {
    let store = store().await;
    store.create_user("u1").await.unwrap();

    for i in 1..=5 {
        store
            .create_thought(NewThought {
                content: &format!("thought {i}"),
                font: "sans-serif",
                category: "thought",
                color: "default",
                user_id: "u1",
            })
            .await
            .unwrap();
    }

    let latest = store.latest_thoughts(3).await.unwrap();
    assert_eq!(latest.len(), 3);
    assert_eq!(latest[0].content, "thought 5");
    assert_eq!(latest[2].content, "thought 3");

    let older = store.thoughts_before(latest[2].id, 10).await.unwrap();
    assert_eq!(older.len(), 2);
    assert_eq!(older[0].content, "thought 2");
}

#[tokio::test]
async fn thought_edits_are_owner_scoped() {
    let store = store().await;
    store.create_user("u1").await.unwrap();

    let thought = store
        .create_thought(NewThought {
            content: "original",
            font: "serif",
            category: "diary",
            color: "default",
            user_id: "u1",
        })
        .await
        .unwrap();

    // Wrong owner: no update.
    assert!(store
        .update_thought(thought.id, "hijacked", "u2")
        .await
        .unwrap()
        .is_none());

    let updated = store
        .update_thought(thought.id, "edited", "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.content, "edited");
    assert_eq!(updated.font, "serif");
}
