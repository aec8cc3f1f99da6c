use super::*;
use std::sync::Mutex;

// Tests in this file mutate process env; serialize them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "TOKEN_RETRIEVAL_SECRET",
    "APP_HOST",
    "APP_PORT",
    "TRUST_FORWARDED_FOR",
    "INDEX_PATH",
    "RATE_LIMIT",
    "TIME_WINDOW",
    "TEMP_BAN_DURATION",
    "RELEVANCE_THRESHOLD",
    "RETRIEVAL_K",
    "UPSTREAM_TIMEOUT_SECS",
    "ANSWER_MAX_TOKENS",
    "ANSWER_SYSTEM_PROMPT",
    "NO_ANSWER_MESSAGE",
    "MAX_QUERY_CHARS",
];

/// # Safety
/// Callers hold `ENV_LOCK`.
unsafe fn clear_app_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

fn base_config() -> AppConfig {
    AppConfig {
        host: DEFAULT_APP_HOST.into(),
        port: DEFAULT_APP_PORT,
        token_secret: "s3cret".into(),
        trust_forwarded_for: false,
        index_path: PathBuf::from(DEFAULT_INDEX_PATH),
        admission: AdmissionConfig::default(),
        retrieval: RetrievalConfig::default(),
        answer: AnswerConfig::default(),
    }
}

#[test]
fn from_env_requires_secret() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_app_env() };

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Missing("TOKEN_RETRIEVAL_SECRET")));

    unsafe { std::env::set_var("TOKEN_RETRIEVAL_SECRET", "") };
    assert!(AppConfig::from_env().is_err());

    unsafe { clear_app_env() };
}

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_app_env();
        std::env::set_var("TOKEN_RETRIEVAL_SECRET", "s3cret");
    }

    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.bind_addr(), "127.0.0.1:8000");
    assert_eq!(cfg.token_secret, "s3cret");
    assert!(!cfg.trust_forwarded_for);
    assert_eq!(cfg.index_path, PathBuf::from("index.json"));
    assert_eq!(cfg.admission, AdmissionConfig::default());
    assert_eq!(cfg.retrieval.k, 3);
    assert!((cfg.retrieval.threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.answer, AnswerConfig::default());

    unsafe { clear_app_env() };
}

#[test]
fn from_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_app_env();
        std::env::set_var("TOKEN_RETRIEVAL_SECRET", "s3cret");
        std::env::set_var("APP_HOST", "0.0.0.0");
        std::env::set_var("APP_PORT", "9100");
        std::env::set_var("TRUST_FORWARDED_FOR", "yes");
        std::env::set_var("RATE_LIMIT", "10");
        std::env::set_var("TIME_WINDOW", "30");
        std::env::set_var("TEMP_BAN_DURATION", "120");
        std::env::set_var("RELEVANCE_THRESHOLD", "0.55");
        std::env::set_var("RETRIEVAL_K", "5");
        std::env::set_var("UPSTREAM_TIMEOUT_SECS", "12");
        std::env::set_var("NO_ANSWER_MESSAGE", "nothing found");
    }

    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.bind_addr(), "0.0.0.0:9100");
    assert!(cfg.trust_forwarded_for);
    assert_eq!(cfg.admission.rate_limit, 10);
    assert_eq!(cfg.admission.window, Duration::from_secs(30));
    assert_eq!(cfg.admission.ban_duration, Duration::from_secs(120));
    assert!((cfg.retrieval.threshold - 0.55).abs() < f32::EPSILON);
    assert_eq!(cfg.retrieval.k, 5);
    assert_eq!(cfg.answer.upstream_timeout, Duration::from_secs(12));
    assert_eq!(cfg.answer.no_answer_message, "nothing found");

    unsafe { clear_app_env() };
}

#[test]
fn from_env_unparseable_values_fall_back() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_app_env();
        std::env::set_var("TOKEN_RETRIEVAL_SECRET", "s3cret");
        std::env::set_var("RATE_LIMIT", "lots");
        std::env::set_var("APP_PORT", "-1");
    }

    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.admission.rate_limit, 60);
    assert_eq!(cfg.port, 8000);

    unsafe { clear_app_env() };
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut cfg = base_config();
    assert!(cfg.validate().is_ok());

    cfg.admission.rate_limit = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { var: "RATE_LIMIT", .. })));

    let mut cfg = base_config();
    cfg.retrieval.threshold = 1.2;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { var: "RELEVANCE_THRESHOLD", .. })));

    let mut cfg = base_config();
    cfg.retrieval.threshold = f32::NAN;
    assert!(cfg.validate().is_err());

    let mut cfg = base_config();
    cfg.retrieval.k = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { var: "RETRIEVAL_K", .. })));

    let mut cfg = base_config();
    cfg.admission.window = Duration::ZERO;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { var: "TIME_WINDOW", .. })));

    let mut cfg = base_config();
    cfg.admission.ban_duration = Duration::from_secs(u64::MAX);
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { var: "TEMP_BAN_DURATION", .. })));
}

#[test]
fn env_bool_variants() {
    for (i, (val, expected)) in [("1", Some(true)), ("On", Some(true)), ("no", Some(false)), ("maybe", None)]
        .iter()
        .enumerate()
    {
        let key = format!("__TEST_RAGCHAT_EB_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), *expected, "value {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
    assert_eq!(env_bool("__TEST_RAGCHAT_EB_UNSET__"), None);
}
