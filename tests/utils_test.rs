use chrono::Utc;
use reqwest::StatusCode;

use gramfollow::errors::{ApiError, AuthError};
use gramfollow::instagram::client::{classify_failure, classify_login_failure};
use gramfollow::management::SessionStore;
use gramfollow::types::{AuthMethod, OutcomeTag, SessionToken, StoredSession};
use gramfollow::utils::*;

#[test]
fn test_normalize_handle_plain() {
    assert_eq!(normalize_handle("someone"), Some("someone".to_string()));
    assert_eq!(normalize_handle("  someone  "), Some("someone".to_string()));
    assert_eq!(normalize_handle("@someone"), Some("someone".to_string()));
}

#[test]
fn test_normalize_handle_urls() {
    assert_eq!(
        normalize_handle("https://www.instagram.com/someone/"),
        Some("someone".to_string())
    );
    assert_eq!(
        normalize_handle("http://instagram.com/someone"),
        Some("someone".to_string())
    );
    assert_eq!(
        normalize_handle("instagram.com/someone/"),
        Some("someone".to_string())
    );
}

#[test]
fn test_normalize_handle_rejects_paths() {
    // Anything that does not name a single profile is dropped
    assert_eq!(normalize_handle("https://x.com/a/b"), None);
    assert_eq!(normalize_handle("https://www.instagram.com/someone/reels"), None);
    assert_eq!(normalize_handle("a/b"), None);
    assert_eq!(normalize_handle(""), None);
    assert_eq!(normalize_handle("https://www.instagram.com/"), None);
}

#[test]
fn test_android_device_id() {
    let id = android_device_id("somebody");

    // Fixed prefix plus 16 hex characters
    assert!(id.starts_with("android-"));
    assert_eq!(id.len(), "android-".len() + 16);
    assert!(
        id["android-".len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
    );

    // Deterministic for the same seed, different for another
    assert_eq!(id, android_device_id("somebody"));
    assert_ne!(id, android_device_id("somebody_else"));
}

#[test]
fn test_uniform_secs_bounds() {
    for _ in 0..100 {
        let sample = uniform_secs(30, 90);
        assert!((30.0..=90.0).contains(&sample));
    }

    // Degenerate range collapses to the single value
    assert_eq!(uniform_secs(5, 5), 5.0);

    // Inverted bounds are swapped, not rejected
    for _ in 0..100 {
        let sample = uniform_secs(90, 30);
        assert!((30.0..=90.0).contains(&sample));
    }
}

#[test]
fn test_session_token_embedded_account_id() {
    let token = SessionToken::new("7231872%3Aabcdef%3A28");
    assert_eq!(token.embedded_account_id(), Some("7231872".to_string()));

    let token = SessionToken::new("7231872:abcdef:28");
    assert_eq!(token.embedded_account_id(), Some("7231872".to_string()));

    // No numeric prefix means no embedded id
    let token = SessionToken::new("abcdef123");
    assert_eq!(token.embedded_account_id(), None);
}

#[test]
fn test_session_token_debug_is_redacted() {
    let token = SessionToken::new("7231872%3Aabcdefghijklmnop");
    let debug = format!("{:?}", token);
    assert!(debug.contains("723187"));
    assert!(!debug.contains("abcdefghijklmnop"));
}

#[test]
fn test_classify_failure_not_found() {
    let err = classify_failure(StatusCode::NOT_FOUND, "{}");
    assert!(matches!(err, ApiError::NotFound));

    let err = classify_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","message":"User not found"}"#,
    );
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
fn test_classify_failure_session_invalid() {
    let err = classify_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","message":"login_required"}"#,
    );
    assert!(matches!(err, ApiError::SessionInvalid));

    let err = classify_failure(StatusCode::UNAUTHORIZED, "");
    assert!(matches!(err, ApiError::SessionInvalid));

    let err = classify_failure(StatusCode::FORBIDDEN, "not even json");
    assert!(matches!(err, ApiError::SessionInvalid));
}

#[test]
fn test_classify_failure_rate_limited() {
    let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "{}");
    assert!(matches!(err, ApiError::RateLimited(_)));

    // The soft limit arrives as a 400 with a message, not a 429
    let err = classify_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","message":"Please wait a few minutes before you try again."}"#,
    );
    assert!(matches!(err, ApiError::RateLimited(_)));

    let err = classify_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","error_type":"rate_limit_error"}"#,
    );
    assert!(matches!(err, ApiError::RateLimited(_)));
}

#[test]
fn test_classify_failure_unexpected_keeps_message() {
    let err = classify_failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"status":"fail","message":"something odd"}"#,
    );
    match err {
        ApiError::Unexpected(reason) => assert!(reason.contains("something odd")),
        other => panic!("expected Unexpected, got {:?}", other),
    }
}

#[test]
fn test_classify_login_failure() {
    let err = classify_login_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","error_type":"bad_password"}"#,
    );
    assert_eq!(err, AuthError::BadPassword);

    let err = classify_login_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","error_type":"two_factor_required"}"#,
    );
    assert_eq!(err, AuthError::TwoFactorRequired);

    let err = classify_login_failure(
        StatusCode::BAD_REQUEST,
        r#"{"status":"fail","message":"challenge_required"}"#,
    );
    assert_eq!(err, AuthError::ChallengeRequired);

    let err = classify_login_failure(StatusCode::UNAUTHORIZED, "{}");
    assert_eq!(err, AuthError::InvalidToken);

    let err = classify_login_failure(StatusCode::INTERNAL_SERVER_ERROR, "{}");
    assert!(matches!(err, AuthError::Unknown(_)));
}

#[test]
fn test_outcome_tag_buckets() {
    // Tags that count as failures in the summary
    assert!(OutcomeTag::RateLimited.is_failure());
    assert!(OutcomeTag::UserNotFound.is_failure());
    assert!(OutcomeTag::SessionExpired.is_failure());
    assert!(OutcomeTag::Failed.is_failure());

    // Tags that do not
    assert!(!OutcomeTag::Followed.is_failure());
    assert!(!OutcomeTag::FollowedAfterWait.is_failure());
    assert!(!OutcomeTag::AlreadyFollowing.is_failure());
}

#[test]
fn test_outcome_tag_labels() {
    assert_eq!(OutcomeTag::Followed.as_str(), "followed");
    assert_eq!(OutcomeTag::AlreadyFollowing.as_str(), "already_following");
    assert_eq!(OutcomeTag::FollowedAfterWait.as_str(), "followed_after_wait");
    assert_eq!(OutcomeTag::SessionExpired.as_str(), "session_expired");
}

#[tokio::test]
async fn test_session_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::at_path(dir.path().join("cache/session.json"));

    // Empty store has nothing to load
    assert!(store.load().await.is_err());

    let session = StoredSession {
        username: Some("somebody".to_string()),
        account_id: "7231872".to_string(),
        session_token: SessionToken::new("7231872%3Aabcdef%3A28"),
        auth_method: AuthMethod::Password,
        obtained_at: Utc::now(),
    };

    store.persist(&session).await.unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded.username, session.username);
    assert_eq!(loaded.account_id, session.account_id);
    assert_eq!(loaded.session_token, session.session_token);
    assert_eq!(loaded.auth_method, AuthMethod::Password);
}
