mod admission;
mod config;
mod error;
mod llm;
mod resolver;
mod retrieval;
mod routes;
mod state;
mod tokens;

use std::net::SocketAddr;
use std::sync::Arc;

use admission::AdmissionLedger;
use config::{AppConfig, ConfigError};
use llm::types::LlmError;
use retrieval::embedding::{EmbeddingConfig, OpenAiEmbedder};
use retrieval::index::VectorIndex;
use retrieval::{RetrievalError, RetrievalGate};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("retrieval: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("llm: {0}")]
    Llm(#[from] LlmError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "ragchat failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();

    let embedder = OpenAiEmbedder::new(EmbeddingConfig::from_env()?)?;
    let embedding_model = embedder.model().to_string();
    let index = VectorIndex::load(&config.index_path, Arc::new(embedder)).await?;
    if let Some(index_model) = index.model()
        && index_model != embedding_model
    {
        tracing::warn!(index_model, embedding_model = %embedding_model, "index was built with a different embedding model");
    }

    let llm = llm::LlmClient::from_env()?;
    tracing::info!(model = llm.model(), "LLM client initialized");

    let ledger = AdmissionLedger::new(config.admission);
    let limits = ledger.config();
    tracing::info!(
        rate_limit = limits.rate_limit,
        window_secs = limits.window.as_secs(),
        ban_secs = limits.ban_duration.as_secs(),
        threshold = config.retrieval.threshold,
        k = config.retrieval.k,
        "admission and retrieval policy"
    );

    let gate = RetrievalGate::new(Arc::new(index), config.retrieval);
    let resolver = resolver::AnswerResolver::new(ledger, gate, Arc::new(llm), &config.token_secret, config.answer);
    let state = state::AppState::new(resolver, config.trust_forwarded_for);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "ragchat listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
