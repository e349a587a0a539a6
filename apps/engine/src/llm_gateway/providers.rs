//! Provider descriptors and the HTTP transport that invokes them.
//!
//! Two wire shapes cover the whole chain: Gemini's `generateContent` and the
//! OpenAI-compatible chat completions endpoint (Groq exposes the same shape).
//! The gateway never talks HTTP directly — it hands a descriptor and a
//! request to a [`ProviderTransport`], which tests replace with scripted
//! fakes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm_gateway::GenerationRequest;

/// Per-call timeout. A timeout is an ordinary provider failure and advances
/// the fallback chain.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub const GEMINI_FREE_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_LITE_MODEL: &str = "gemini-2.0-flash-lite";
pub const GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Stable identity of one candidate in the chain — used for usage counters,
/// forced routing, and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    GeminiFree,
    GeminiLite,
    Groq,
    OpenAi,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderId::GeminiFree => "gemini-free",
            ProviderId::GeminiLite => "gemini-lite",
            ProviderId::Groq => "groq",
            ProviderId::OpenAi => "openai",
        };
        f.write_str(name)
    }
}

/// Which wire shape a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderApi {
    Gemini,
    OpenAiCompatible { url: &'static str },
}

/// Immutable configuration for one upstream provider. Not session-scoped.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub model: &'static str,
    pub api: ProviderApi,
    /// Rolling daily request budget, for free-tier providers only.
    pub daily_free_quota: Option<u32>,
}

impl ProviderDescriptor {
    pub fn gemini_free(daily_free_quota: u32) -> Self {
        Self {
            id: ProviderId::GeminiFree,
            model: GEMINI_FREE_MODEL,
            api: ProviderApi::Gemini,
            daily_free_quota: Some(daily_free_quota),
        }
    }

    pub fn gemini_lite() -> Self {
        Self {
            id: ProviderId::GeminiLite,
            model: GEMINI_LITE_MODEL,
            api: ProviderApi::Gemini,
            daily_free_quota: None,
        }
    }

    pub fn groq() -> Self {
        Self {
            id: ProviderId::Groq,
            model: GROQ_MODEL,
            api: ProviderApi::OpenAiCompatible { url: GROQ_API_URL },
            daily_free_quota: None,
        }
    }

    pub fn openai() -> Self {
        Self {
            id: ProviderId::OpenAi,
            model: OPENAI_MODEL,
            api: ProviderApi::OpenAiCompatible { url: OPENAI_API_URL },
            daily_free_quota: None,
        }
    }
}

/// Transient, per-call provider failure. Absorbed by chain fallback.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured for {0}")]
    MissingCredentials(ProviderId),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Performs one provider's wire call. The trait seam lets tests script
/// success/failure per provider without any network access.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP transport
// ────────────────────────────────────────────────────────────────────────────

/// Production transport: speaks each provider's wire format over reqwest.
pub struct HttpTransport {
    client: Client,
    openai_api_key: String,
    gemini_api_key: Option<String>,
    groq_api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(
        openai_api_key: String,
        gemini_api_key: Option<String>,
        groq_api_key: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            openai_api_key,
            gemini_api_key,
            groq_api_key,
        }
    }

    fn bearer_key(&self, id: ProviderId) -> Result<&str, ProviderError> {
        match id {
            ProviderId::OpenAi => Ok(&self.openai_api_key),
            ProviderId::Groq => self
                .groq_api_key
                .as_deref()
                .ok_or(ProviderError::MissingCredentials(id)),
            _ => Err(ProviderError::MissingCredentials(id)),
        }
    }

    async fn call_openai_compatible(
        &self,
        url: &str,
        provider: &ProviderDescriptor,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: provider.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer_key(provider.id)?)
            .timeout(CALL_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("empty completion".to_string()))
    }

    async fn call_gemini(
        &self,
        provider: &ProviderDescriptor,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let key = self
            .gemini_api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials(provider.id))?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: request.system_prompt.as_deref().map(|text| GeminiContent {
                parts: vec![GeminiPart { text }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={key}",
            provider.model
        );

        let response = self
            .client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("empty candidate".to_string()))
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        debug!("Calling {} (model: {})", provider.id, provider.model);
        match provider.api {
            ProviderApi::Gemini => self.call_gemini(provider, request).await,
            ProviderApi::OpenAiCompatible { url } => {
                self.call_openai_compatible(url, provider, request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_identities() {
        assert_eq!(ProviderDescriptor::gemini_free(100).id, ProviderId::GeminiFree);
        assert_eq!(ProviderDescriptor::gemini_lite().daily_free_quota, None);
        assert!(matches!(
            ProviderDescriptor::groq().api,
            ProviderApi::OpenAiCompatible { .. }
        ));
        assert_eq!(ProviderDescriptor::openai().model, OPENAI_MODEL);
    }

    #[test]
    fn test_provider_id_display() {
        assert_eq!(ProviderId::GeminiFree.to_string(), "gemini-free");
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_chat_request_serializes_expected_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "be brief",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.2,
            max_tokens: 256,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_gemini_request_omits_missing_system_instruction() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi" }],
            }],
            system_instruction: None,
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                max_output_tokens: 128,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("systemInstruction").is_none());
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 128);
    }

    #[test]
    fn test_gemini_response_text_extraction() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .unwrap();
        assert_eq!(text, "hello");
    }
}
