//! LLM Gateway — the single point of entry for all generation calls in
//! Parley.
//!
//! ARCHITECTURAL RULE: no other module may call an upstream provider
//! directly. All generation goes through [`LlmGateway::generate`], which
//! walks a cost-ordered, quota-aware provider chain and fails with
//! [`LlmError::Exhausted`] only when every candidate fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, warn};

pub mod providers;
pub mod quota;

use providers::{ProviderDescriptor, ProviderId, ProviderTransport};
use quota::QuotaLedger;

/// One generation request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Bypass the chain and route to exactly this provider.
    pub force_provider: Option<ProviderId>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1024,
            force_provider: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Terminal gateway error. Per-call provider failures are absorbed by the
/// chain and only surface here once every candidate has failed.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("all providers exhausted after {} attempts", .tried.len())]
    Exhausted { tried: Vec<String> },

    #[error("provider {0} is not configured")]
    ProviderNotConfigured(ProviderId),
}

/// Static gateway configuration derived from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// When false, the chain is bypassed for the designated provider
    /// (OpenAI) — a known baseline distinct from the optimized path.
    pub cost_optimized: bool,
    pub gemini_configured: bool,
    pub groq_configured: bool,
    pub gemini_daily_free_quota: u32,
}

impl GatewayConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            cost_optimized: config.cost_optimized,
            gemini_configured: config.gemini_api_key.is_some(),
            groq_configured: config.groq_api_key.is_some(),
            gemini_daily_free_quota: config.gemini_daily_free_quota,
        }
    }
}

#[derive(Debug)]
struct GatewayUsage {
    calls: HashMap<ProviderId, u64>,
    free_tier: QuotaLedger,
}

/// Dispatches generation requests across an ordered, quota-aware provider
/// chain. Shared process-wide; counters are behind one mutex and are not
/// coordinated across worker processes.
pub struct LlmGateway {
    transport: Arc<dyn ProviderTransport>,
    config: GatewayConfig,
    usage: Mutex<GatewayUsage>,
}

impl LlmGateway {
    pub fn new(transport: Arc<dyn ProviderTransport>, config: GatewayConfig) -> Self {
        let free_tier = QuotaLedger::new(config.gemini_daily_free_quota, Utc::now().date_naive());
        Self {
            transport,
            config,
            usage: Mutex::new(GatewayUsage {
                calls: HashMap::new(),
                free_tier,
            }),
        }
    }

    /// Generates text, trying each eligible candidate in cost order.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        self.generate_at(request, Utc::now().date_naive()).await
    }

    /// Same as [`generate`], with "today" injected for quota determinism.
    async fn generate_at(
        &self,
        request: GenerationRequest,
        today: NaiveDate,
    ) -> Result<String, LlmError> {
        let candidates = self.candidates(today, request.force_provider)?;
        let mut tried = Vec::with_capacity(candidates.len());

        for descriptor in candidates {
            match self.transport.complete(&descriptor, &request).await {
                Ok(text) => {
                    self.record_success(&descriptor, today);
                    debug!("Generation served by {}", descriptor.id);
                    return Ok(text);
                }
                Err(err) => {
                    warn!("Provider {} failed: {err}", descriptor.id);
                    tried.push(format!("{}: {err}", descriptor.id));
                }
            }
        }

        Err(LlmError::Exhausted { tried })
    }

    /// The prioritized candidate list, lazily filtered against current quota
    /// state. Eligibility ("who can serve this request now") is decided here;
    /// invocation lives in the transport.
    fn candidates(
        &self,
        today: NaiveDate,
        force: Option<ProviderId>,
    ) -> Result<Vec<ProviderDescriptor>, LlmError> {
        if let Some(id) = force {
            return Ok(vec![self.descriptor_for(id)?]);
        }

        if !self.config.cost_optimized {
            return Ok(vec![ProviderDescriptor::openai()]);
        }

        let mut chain = Vec::with_capacity(4);
        if self.config.gemini_configured {
            let mut usage = self.usage.lock().expect("gateway usage mutex poisoned");
            if usage.free_tier.has_budget(today) {
                chain.push(ProviderDescriptor::gemini_free(
                    self.config.gemini_daily_free_quota,
                ));
            }
            // Cheaper fallback of the same vendor: always in the chain.
            chain.push(ProviderDescriptor::gemini_lite());
        }
        if self.config.groq_configured {
            chain.push(ProviderDescriptor::groq());
        }
        // Highest-reliability last resort.
        chain.push(ProviderDescriptor::openai());
        Ok(chain)
    }

    fn descriptor_for(&self, id: ProviderId) -> Result<ProviderDescriptor, LlmError> {
        let descriptor = match id {
            ProviderId::GeminiFree if self.config.gemini_configured => {
                ProviderDescriptor::gemini_free(self.config.gemini_daily_free_quota)
            }
            ProviderId::GeminiLite if self.config.gemini_configured => {
                ProviderDescriptor::gemini_lite()
            }
            ProviderId::Groq if self.config.groq_configured => ProviderDescriptor::groq(),
            ProviderId::OpenAi => ProviderDescriptor::openai(),
            other => return Err(LlmError::ProviderNotConfigured(other)),
        };
        Ok(descriptor)
    }

    fn record_success(&self, descriptor: &ProviderDescriptor, today: NaiveDate) {
        let mut usage = self.usage.lock().expect("gateway usage mutex poisoned");
        *usage.calls.entry(descriptor.id).or_insert(0) += 1;
        if descriptor.daily_free_quota.is_some() {
            usage.free_tier.record(today);
        }
    }

    /// Total successful calls served by `id` since startup.
    pub fn calls_to(&self, id: ProviderId) -> u64 {
        self.usage
            .lock()
            .expect("gateway usage mutex poisoned")
            .calls
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Free-tier requests consumed in the current quota window.
    pub fn free_tier_used(&self) -> u32 {
        self.usage
            .lock()
            .expect("gateway usage mutex poisoned")
            .free_tier
            .used()
    }
}

#[cfg(test)]
mod tests {
    use super::providers::ProviderError;
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct ScriptedTransport {
        failing: HashSet<ProviderId>,
        calls: Mutex<Vec<ProviderId>>,
    }

    impl ScriptedTransport {
        fn failing(ids: &[ProviderId]) -> Arc<Self> {
            Arc::new(Self {
                failing: ids.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn invoked(&self) -> Vec<ProviderId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderTransport for ScriptedTransport {
        async fn complete(
            &self,
            provider: &ProviderDescriptor,
            _request: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(provider.id);
            if self.failing.contains(&provider.id) {
                Err(ProviderError::Api {
                    status: 500,
                    message: "scripted failure".to_string(),
                })
            } else {
                Ok(format!("reply from {}", provider.id))
            }
        }
    }

    fn optimized_config() -> GatewayConfig {
        GatewayConfig {
            cost_optimized: true,
            gemini_configured: true,
            groq_configured: true,
            gemini_daily_free_quota: 2,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        // A (gemini-free) fails, B (gemini-lite) succeeds — C and D are
        // never invoked.
        let transport = ScriptedTransport::failing(&[ProviderId::GeminiFree]);
        let gateway = LlmGateway::new(transport.clone(), optimized_config());

        let out = gateway
            .generate_at(GenerationRequest::new("hello"), day(1))
            .await
            .unwrap();

        assert_eq!(out, "reply from gemini-lite");
        assert_eq!(
            transport.invoked(),
            vec![ProviderId::GeminiFree, ProviderId::GeminiLite]
        );
        assert_eq!(gateway.calls_to(ProviderId::GeminiLite), 1);
    }

    #[tokio::test]
    async fn test_exhausted_when_every_candidate_fails() {
        let transport = ScriptedTransport::failing(&[
            ProviderId::GeminiFree,
            ProviderId::GeminiLite,
            ProviderId::Groq,
            ProviderId::OpenAi,
        ]);
        let gateway = LlmGateway::new(transport.clone(), optimized_config());

        let err = gateway
            .generate_at(GenerationRequest::new("hello"), day(1))
            .await
            .unwrap_err();

        match err {
            LlmError::Exhausted { tried } => assert_eq!(tried.len(), 4),
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(transport.invoked().len(), 4);
    }

    #[tokio::test]
    async fn test_quota_excludes_free_tier_then_rollover_restores_it() {
        let transport = ScriptedTransport::failing(&[]);
        let gateway = LlmGateway::new(transport.clone(), optimized_config());

        // Quota is 2: both calls land on the free-tier primary.
        for _ in 0..2 {
            gateway
                .generate_at(GenerationRequest::new("q"), day(1))
                .await
                .unwrap();
        }
        assert_eq!(gateway.free_tier_used(), 2);

        // Third call the same day: the free tier is excluded from the chain.
        gateway
            .generate_at(GenerationRequest::new("q"), day(1))
            .await
            .unwrap();
        assert_eq!(*transport.invoked().last().unwrap(), ProviderId::GeminiLite);

        // Simulated date rollover: the primary reappears, counter reset.
        gateway
            .generate_at(GenerationRequest::new("q"), day(2))
            .await
            .unwrap();
        assert_eq!(*transport.invoked().last().unwrap(), ProviderId::GeminiFree);
        assert_eq!(gateway.free_tier_used(), 1);
    }

    #[tokio::test]
    async fn test_non_optimized_mode_bypasses_chain() {
        let transport = ScriptedTransport::failing(&[]);
        let config = GatewayConfig {
            cost_optimized: false,
            ..optimized_config()
        };
        let gateway = LlmGateway::new(transport.clone(), config);

        let out = gateway
            .generate_at(GenerationRequest::new("hello"), day(1))
            .await
            .unwrap();

        assert_eq!(out, "reply from openai");
        assert_eq!(transport.invoked(), vec![ProviderId::OpenAi]);
    }

    #[tokio::test]
    async fn test_forced_provider_routes_directly() {
        let transport = ScriptedTransport::failing(&[]);
        let gateway = LlmGateway::new(transport.clone(), optimized_config());

        let mut request = GenerationRequest::new("hello");
        request.force_provider = Some(ProviderId::Groq);
        let out = gateway.generate_at(request, day(1)).await.unwrap();

        assert_eq!(out, "reply from groq");
        assert_eq!(transport.invoked(), vec![ProviderId::Groq]);
    }

    #[tokio::test]
    async fn test_forced_unconfigured_provider_is_an_error() {
        let transport = ScriptedTransport::failing(&[]);
        let config = GatewayConfig {
            groq_configured: false,
            ..optimized_config()
        };
        let gateway = LlmGateway::new(transport, config);

        let mut request = GenerationRequest::new("hello");
        request.force_provider = Some(ProviderId::Groq);
        let err = gateway.generate_at(request, day(1)).await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderNotConfigured(ProviderId::Groq)));
    }
}
