use super::*;
use crate::state::test_helpers::StaticStore;

fn gate(store: StaticStore) -> RetrievalGate {
    RetrievalGate::new(Arc::new(store), RetrievalConfig::default())
}

#[tokio::test]
async fn empty_results_are_ungrounded() {
    let gate = gate(StaticStore::scored(&[]));
    assert_eq!(gate.resolve_context("anything").await.unwrap(), Grounding::Ungrounded);
}

#[tokio::test]
async fn just_below_threshold_is_ungrounded() {
    let gate = gate(StaticStore::scored(&[("hosting plans", 0.6999)]));
    assert_eq!(gate.resolve_context("plans").await.unwrap(), Grounding::Ungrounded);
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let gate = gate(StaticStore::scored(&[("hosting plans", 0.7)]));
    assert_eq!(
        gate.resolve_context("plans").await.unwrap(),
        Grounding::Grounded("hosting plans".into())
    );
}

#[tokio::test]
async fn non_finite_top_score_is_ungrounded() {
    for score in [f32::NAN, f32::INFINITY] {
        let gate = gate(StaticStore::scored(&[("hosting plans", score)]));
        assert_eq!(gate.resolve_context("plans").await.unwrap(), Grounding::Ungrounded, "score {score}");
    }
}

#[tokio::test]
async fn grounded_context_joins_all_passages_in_order() {
    let gate = gate(StaticStore::scored(&[("first", 0.91), ("second", 0.5), ("third", 0.2)]));
    let Grounding::Grounded(context) = gate.resolve_context("q").await.unwrap() else {
        panic!("expected grounded");
    };
    assert_eq!(context, "first\n\n---\n\nsecond\n\n---\n\nthird");
}

#[tokio::test]
async fn low_trailing_scores_do_not_matter() {
    // Only the top entry is compared with the threshold.
    let gate = gate(StaticStore::scored(&[("strong", 0.8), ("weak", 0.1)]));
    assert!(matches!(gate.resolve_context("q").await.unwrap(), Grounding::Grounded(_)));
}

#[tokio::test]
async fn results_are_capped_at_k() {
    let store = StaticStore::scored(&[("a", 0.9), ("b", 0.9), ("c", 0.9), ("d", 0.9)]);
    let gate = RetrievalGate::new(Arc::new(store), RetrievalConfig { threshold: 0.7, k: 2 });
    assert_eq!(
        gate.resolve_context("q").await.unwrap(),
        Grounding::Grounded("a\n\n---\n\nb".into())
    );
}

#[tokio::test]
async fn custom_threshold_is_honored() {
    let store = StaticStore::scored(&[("a", 0.45)]);
    let gate = RetrievalGate::new(Arc::new(store), RetrievalConfig { threshold: 0.4, k: 3 });
    assert!(matches!(gate.resolve_context("q").await.unwrap(), Grounding::Grounded(_)));
}

#[tokio::test]
async fn store_failure_propagates() {
    let gate = gate(StaticStore::failing());
    let err = gate.resolve_context("q").await.unwrap_err();
    assert!(err.retryable());
}

#[tokio::test]
async fn search_receives_configured_k() {
    let store = Arc::new(StaticStore::scored(&[("a", 0.9)]));
    let gate = RetrievalGate::new(store.clone(), RetrievalConfig { threshold: 0.7, k: 5 });
    gate.resolve_context("q").await.unwrap();
    assert_eq!(store.calls(), 1);
    assert_eq!(store.last_k(), Some(5));
}

#[test]
fn retryable_embedding_statuses() {
    let throttled = RetrievalError::EmbeddingResponse { status: 429, body: String::new() };
    let unavailable = RetrievalError::EmbeddingResponse { status: 503, body: String::new() };
    let bad_request = RetrievalError::EmbeddingResponse { status: 400, body: String::new() };
    assert!(throttled.retryable());
    assert!(unavailable.retryable());
    assert!(!bad_request.retryable());
    assert!(!RetrievalError::DimensionMismatch { expected: 3, actual: 2 }.retryable());
}
