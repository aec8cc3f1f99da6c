use super::*;

#[test]
fn parse_single_embedding() {
    let json = serde_json::json!({
        "object": "list",
        "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, -0.2, 0.3] }],
        "model": "text-embedding-3-small"
    })
    .to_string();
    let vectors = parse_embeddings_response(&json).unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0], vec![0.1_f32, -0.2, 0.3]);
}

#[test]
fn parse_orders_by_index() {
    let json = serde_json::json!({
        "data": [
            { "index": 1, "embedding": [2.0] },
            { "index": 0, "embedding": [1.0] }
        ]
    })
    .to_string();
    let vectors = parse_embeddings_response(&json).unwrap();
    assert_eq!(vectors, vec![vec![1.0_f32], vec![2.0_f32]]);
}

#[test]
fn parse_missing_data_errors() {
    let json = serde_json::json!({ "error": { "message": "bad key" } }).to_string();
    let err = parse_embeddings_response(&json).unwrap_err();
    assert!(err.to_string().contains("missing data array"));
}

#[test]
fn parse_non_numeric_component_errors() {
    let json = serde_json::json!({ "data": [{ "index": 0, "embedding": [0.1, "x"] }] }).to_string();
    assert!(matches!(parse_embeddings_response(&json), Err(RetrievalError::EmbeddingParse(_))));
}

#[test]
fn parse_invalid_json_errors() {
    assert!(matches!(parse_embeddings_response("not json"), Err(RetrievalError::EmbeddingParse(_))));
}

#[test]
fn from_env_reads_named_key_var() {
    unsafe {
        std::env::set_var("EMBEDDING_API_KEY_ENV", "__TEST_RAGCHAT_EMBED_KEY__");
        std::env::set_var("__TEST_RAGCHAT_EMBED_KEY__", "sk-embed");
        std::env::set_var("EMBEDDING_BASE_URL", "https://embed.example.test/v1/");
    }

    let cfg = EmbeddingConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "sk-embed");
    assert_eq!(cfg.base_url, "https://embed.example.test/v1");

    unsafe { std::env::set_var("EMBEDDING_API_KEY_ENV", "__TEST_RAGCHAT_EMBED_KEY_UNSET__") };
    let err = EmbeddingConfig::from_env().unwrap_err();
    assert!(matches!(err, RetrievalError::MissingApiKey { var } if var == "__TEST_RAGCHAT_EMBED_KEY_UNSET__"));

    unsafe {
        std::env::remove_var("EMBEDDING_API_KEY_ENV");
        std::env::remove_var("__TEST_RAGCHAT_EMBED_KEY__");
        std::env::remove_var("EMBEDDING_BASE_URL");
    }
}
