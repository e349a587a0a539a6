use std::sync::Arc;

use crate::config::Config;
use crate::context::ContextBuilder;
use crate::embeddings::{EmbeddingClient, HttpEmbeddingTransport};
use crate::evaluation::{EvaluateResponse, LlmEvaluator};
use crate::interview::InterviewEngine;
use crate::llm_gateway::providers::HttpTransport;
use crate::llm_gateway::{GatewayConfig, LlmGateway};
use crate::vector::VectorIndex;

/// Shared engine state. Every component is constructed exactly once at
/// startup and passed by reference — no global singleton accessors, so tests
/// substitute any seam without touching call sites.
///
/// The boundary layer (HTTP, voice) consumes the full graph; the terminal
/// shim only touches `config` and `interviews`.
#[allow(dead_code)]
pub struct EngineState {
    pub config: Config,
    pub gateway: Arc<LlmGateway>,
    pub embeddings: Arc<EmbeddingClient>,
    pub vectors: Arc<VectorIndex>,
    pub context: Arc<ContextBuilder>,
    pub evaluator: Arc<dyn EvaluateResponse>,
    pub interviews: Arc<InterviewEngine>,
}

impl EngineState {
    /// Wires the production component graph, leaves first.
    pub fn from_config(config: Config) -> Self {
        let transport = Arc::new(HttpTransport::new(
            config.openai_api_key.clone(),
            config.gemini_api_key.clone(),
            config.groq_api_key.clone(),
        ));
        let gateway = Arc::new(LlmGateway::new(transport, GatewayConfig::from_config(&config)));

        let embedding_transport = Arc::new(HttpEmbeddingTransport::new(
            config.openai_api_key.clone(),
            config.gemini_api_key.clone(),
        ));
        let embeddings = Arc::new(EmbeddingClient::new(
            embedding_transport,
            config.gemini_api_key.is_some(),
        ));

        let vectors = Arc::new(VectorIndex::new());
        let context = Arc::new(ContextBuilder::new(embeddings.clone(), vectors.clone()));

        let evaluator: Arc<dyn EvaluateResponse> = Arc::new(LlmEvaluator::new(gateway.clone()));

        let interviews = Arc::new(InterviewEngine::new(
            gateway.clone(),
            context.clone(),
            evaluator.clone(),
            config.max_sessions,
        ));

        Self {
            config,
            gateway,
            embeddings,
            vectors,
            context,
            evaluator,
            interviews,
        }
    }
}
