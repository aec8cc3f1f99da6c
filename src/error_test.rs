use super::*;

#[test]
fn rate_limited_and_banned_render_identically() {
    let limited = GateError::from(Rejection::RateLimited);
    let banned = GateError::from(Rejection::Banned);
    assert_eq!(limited.to_string(), banned.to_string());
    assert_eq!(limited.error_code(), banned.error_code());
}

#[test]
fn internal_message_is_generic() {
    let err = GateError::Internal { retryable: true };
    assert_eq!(err.to_string(), "internal server error");
    assert_eq!(err.error_code(), "E_INTERNAL");
}

#[test]
fn retryable_kinds() {
    assert!(GateError::TooManyRequests(Rejection::Banned).retryable());
    assert!(GateError::Internal { retryable: true }.retryable());
    assert!(!GateError::Internal { retryable: false }.retryable());
    assert!(!GateError::Forbidden("token is invalid or already used").retryable());
    assert!(!GateError::Unauthorized("token header is missing").retryable());
    assert!(!GateError::Validation("query must not be empty".into()).retryable());
}
