//! Session token round-trip and failure tests

use chrono::Utc;
use restspace::SessionIssuer;

const SECRET: &str = "test_secret_key_for_testing_only_32_chars_long";

#[test]
fn issue_then_verify_returns_user_id() {
    let issuer = SessionIssuer::new(SECRET);

    let token = issuer.issue("user-42").unwrap();
    let user_id = issuer.verify(&token).unwrap();

    assert_eq!(user_id, "user-42");
}

#[test]
fn token_signed_with_different_key_fails() {
    let issuer = SessionIssuer::new(SECRET);
    let other = SessionIssuer::new("a_completely_different_signing_key_here");

    let token = other.issue("user-42").unwrap();

    assert!(issuer.verify(&token).is_err());
}

#[test]
fn expired_token_fails() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let issuer = SessionIssuer::new(SECRET);

    // Same claim shape the issuer produces, with expiry well past the
    // validator's leeway.
    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": "user-42",
        "iat": now - 600,
        "exp": now - 300,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    assert!(issuer.verify(&token).is_err());
}

#[test]
fn malformed_token_fails() {
    let issuer = SessionIssuer::new(SECRET);

    assert!(issuer.verify("not-a-jwt").is_err());
    assert!(issuer.verify("").is_err());
}
