//! Embedding Client — turns text into fixed-dimension vectors, with its own
//! provider fallback chain.
//!
//! Degradation contract: if every provider fails, the client returns zero
//! vectors instead of erroring, so downstream vector search degrades to
//! "no signal" rather than breaking an interview turn.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Every embedding in the system has exactly this many dimensions. The
/// OpenAI fallback is asked for the same width so vectors from either
/// provider live in one index.
pub const EMBEDDING_DIM: usize = 768;

pub const GEMINI_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const GEMINI_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents";
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingProviderId {
    Gemini,
    OpenAi,
}

impl std::fmt::Display for EmbeddingProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderId::Gemini => f.write_str("gemini"),
            EmbeddingProviderId::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured for {0}")]
    MissingCredentials(EmbeddingProviderId),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Performs one embedding provider's wire call; tests substitute fakes.
#[async_trait]
pub trait EmbeddingTransport: Send + Sync {
    async fn embed(
        &self,
        provider: EmbeddingProviderId,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embedding client with Gemini-primary, OpenAI-fallback ordering.
pub struct EmbeddingClient {
    transport: Arc<dyn EmbeddingTransport>,
    gemini_configured: bool,
}

impl EmbeddingClient {
    pub fn new(transport: Arc<dyn EmbeddingTransport>, gemini_configured: bool) -> Self {
        Self {
            transport,
            gemini_configured,
        }
    }

    /// Embeds one text. Returns the zero vector only if all providers fail.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let batch = [text.to_string()];
        self.embed_batch(&batch)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| vec![0.0; EMBEDDING_DIM])
    }

    /// Embeds a batch, preserving input order. Falls back across providers;
    /// on total failure every entry is the zero vector.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }

        let mut chain = Vec::with_capacity(2);
        if self.gemini_configured {
            chain.push(EmbeddingProviderId::Gemini);
        }
        chain.push(EmbeddingProviderId::OpenAi);

        for provider in chain {
            match self.transport.embed(provider, texts).await {
                Ok(vectors) if well_formed(&vectors, texts.len()) => return vectors,
                Ok(_) => {
                    warn!("Embedding provider {provider} returned a malformed batch");
                }
                Err(err) => {
                    warn!("Embedding provider {provider} failed: {err}");
                }
            }
        }

        warn!(
            "All embedding providers failed; degrading {} text(s) to zero vectors",
            texts.len()
        );
        texts.iter().map(|_| vec![0.0; EMBEDDING_DIM]).collect()
    }
}

fn well_formed(vectors: &[Vec<f32>], expected: usize) -> bool {
    vectors.len() == expected && vectors.iter().all(|v| v.len() == EMBEDDING_DIM)
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shapes & HTTP transport
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedRequest<'a> {
    model: &'a str,
    content: GeminiEmbedContent<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedContent<'a> {
    parts: Vec<GeminiEmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiBatchResponse {
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingRow {
    embedding: Vec<f32>,
}

/// Production transport for both embedding providers.
pub struct HttpEmbeddingTransport {
    client: Client,
    openai_api_key: String,
    gemini_api_key: Option<String>,
}

impl HttpEmbeddingTransport {
    pub fn new(openai_api_key: String, gemini_api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            openai_api_key,
            gemini_api_key,
        }
    }

    async fn embed_gemini(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let key = self
            .gemini_api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingCredentials(EmbeddingProviderId::Gemini))?;

        let body = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: GEMINI_EMBEDDING_MODEL,
                    content: GeminiEmbedContent {
                        parts: vec![GeminiEmbedPart { text }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{GEMINI_EMBED_URL}?key={key}"))
            .timeout(EMBED_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiBatchResponse = response.json().await?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = OpenAiEmbedRequest {
            model: OPENAI_EMBEDDING_MODEL,
            input: texts,
            // Ask for the shared width so both providers index together.
            dimensions: EMBEDDING_DIM,
        };

        let response = self
            .client
            .post(OPENAI_EMBED_URL)
            .bearer_auth(&self.openai_api_key)
            .timeout(EMBED_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OpenAiEmbedResponse = response.json().await?;
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingTransport for HttpEmbeddingTransport {
    async fn embed(
        &self,
        provider: EmbeddingProviderId,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match provider {
            EmbeddingProviderId::Gemini => self.embed_gemini(texts).await,
            EmbeddingProviderId::OpenAi => self.embed_openai(texts).await,
        }
    }
}
