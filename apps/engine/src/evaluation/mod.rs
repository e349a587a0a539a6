//! Response Evaluator — builds rubric-specific prompts, calls the LLM
//! Gateway, and parses the result via the JSON Extractor.
//!
//! Evaluation never raises to the caller: on provider exhaustion or an
//! unparseable reply it substitutes a rubric-midpoint default flagged
//! `fallback = true` with a reason code, so a turn always proceeds.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub mod prompts;

use crate::extract::extract_json;
use crate::interview::profile::InterviewKind;
use crate::llm_gateway::{GenerationRequest, LlmGateway};

pub const SCALE_MIN: f64 = 1.0;
pub const SCALE_MAX: f64 = 5.0;
pub const SCALE_MIDPOINT: f64 = 3.0;

/// Number of prior exchanges embedded in the evaluation prompt for
/// consistency scoring.
pub const HISTORY_WINDOW: usize = 3;

/// The STAR element a behavioral answer is most missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarComponent {
    Situation,
    Task,
    Action,
    Result,
}

impl StarComponent {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "situation" => Some(Self::Situation),
            "task" => Some(Self::Task),
            "action" => Some(Self::Action),
            "result" => Some(Self::Result),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Situation => "situation",
            Self::Task => "task",
            Self::Action => "action",
            Self::Result => "result",
        }
    }
}

/// Why an evaluation was degraded to the fixed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ProviderExhausted,
    Unparseable,
}

/// One prior question/answer pair, used as prompt context.
#[derive(Debug, Clone)]
pub struct QaExchange {
    pub question: String,
    pub answer: String,
}

/// Structured judgment of one answer. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Named 1–5 sub-scores; keys are the rubric's dimensions.
    pub scores: BTreeMap<String, f64>,
    pub strengths: Vec<String>,
    pub growth_areas: Vec<String>,
    /// Behavioral follow-up signal.
    pub missing_component: Option<StarComponent>,
    /// Screening follow-up signal (substance-based, never answer length).
    pub needs_clarification: bool,
    /// Technical follow-up signal.
    pub unresolved_topics: Vec<String>,
    /// True when this is a substituted default, with the reason below.
    pub fallback: bool,
    pub fallback_reason: Option<FallbackReason>,
}

impl Evaluation {
    /// The fixed default substituted when live evaluation is unavailable:
    /// every rubric dimension at the scale midpoint, transparently flagged.
    pub fn fallback_for(kind: InterviewKind, reason: FallbackReason) -> Self {
        let scores = rubric_for(kind)
            .dimensions
            .iter()
            .map(|dim| (dim.to_string(), SCALE_MIDPOINT))
            .collect();
        Self {
            scores,
            strengths: Vec::new(),
            growth_areas: Vec::new(),
            missing_component: None,
            needs_clarification: false,
            unresolved_topics: Vec::new(),
            fallback: true,
            fallback_reason: Some(reason),
        }
    }

    /// Mean of this evaluation's sub-scores (midpoint when empty).
    pub fn overall(&self) -> f64 {
        if self.scores.is_empty() {
            return SCALE_MIDPOINT;
        }
        self.scores.values().sum::<f64>() / self.scores.len() as f64
    }
}

/// A scoring rubric: the dimensions scored and the prompt that scores them.
pub struct Rubric {
    pub dimensions: &'static [&'static str],
    template: &'static str,
}

static SCREENING_RUBRIC: Rubric = Rubric {
    dimensions: &["communication", "relevance", "experience_fit", "motivation"],
    template: prompts::SCREENING_EVALUATION_TEMPLATE,
};

static BEHAVIORAL_RUBRIC: Rubric = Rubric {
    dimensions: &["structure", "specificity", "impact", "self_awareness"],
    template: prompts::BEHAVIORAL_EVALUATION_TEMPLATE,
};

static TECHNICAL_RUBRIC: Rubric = Rubric {
    dimensions: &["accuracy", "depth", "problem_solving", "clarity"],
    template: prompts::TECHNICAL_EVALUATION_TEMPLATE,
};

pub fn rubric_for(kind: InterviewKind) -> &'static Rubric {
    match kind {
        InterviewKind::Screening => &SCREENING_RUBRIC,
        InterviewKind::Behavioral => &BEHAVIORAL_RUBRIC,
        InterviewKind::Technical => &TECHNICAL_RUBRIC,
    }
}

/// Fills the rubric template with the question, answer, and a bounded window
/// of prior exchanges.
pub fn build_evaluation_prompt(
    kind: InterviewKind,
    question: &str,
    response_text: &str,
    history: &[QaExchange],
) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let window = &history[start..];
    let history_block = if window.is_empty() {
        "(none)".to_string()
    } else {
        window
            .iter()
            .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    rubric_for(kind)
        .template
        .replace("{history}", &history_block)
        .replace("{question}", question)
        .replace("{response}", response_text)
}

/// Always yields an evaluation: the parsed judgment when the model text is
/// recoverable, the flagged default otherwise.
pub fn safe_parse_evaluation(kind: InterviewKind, text: &str) -> Evaluation {
    match extract_json(text).and_then(|value| evaluation_from_value(kind, &value)) {
        Some(evaluation) => evaluation,
        None => {
            warn!("Unparseable evaluation response; substituting default");
            Evaluation::fallback_for(kind, FallbackReason::Unparseable)
        }
    }
}

fn evaluation_from_value(kind: InterviewKind, value: &Value) -> Option<Evaluation> {
    let raw_scores = value.get("scores")?.as_object()?;

    let mut scores = BTreeMap::new();
    for dim in rubric_for(kind).dimensions {
        if let Some(score) = raw_scores.get(*dim).and_then(Value::as_f64) {
            scores.insert(dim.to_string(), score.clamp(SCALE_MIN, SCALE_MAX));
        }
    }
    if scores.is_empty() {
        return None;
    }

    Some(Evaluation {
        scores,
        strengths: string_list(value.get("strengths")),
        growth_areas: string_list(value.get("growth_areas")),
        missing_component: value
            .get("missing_component")
            .and_then(Value::as_str)
            .and_then(StarComponent::parse),
        needs_clarification: value
            .get("needs_clarification")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        unresolved_topics: string_list(value.get("unresolved_topics")),
        fallback: false,
        fallback_reason: None,
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The evaluator seam. The state machine only sees this trait, so tests
/// drive follow-up policy with scripted judgments.
#[async_trait]
pub trait EvaluateResponse: Send + Sync {
    async fn evaluate(
        &self,
        kind: InterviewKind,
        question: &str,
        response_text: &str,
        history: &[QaExchange],
    ) -> Evaluation;
}

/// Production evaluator: rubric prompt → gateway (low temperature) →
/// extractor → typed evaluation, degrading to the flagged default.
pub struct LlmEvaluator {
    gateway: Arc<LlmGateway>,
}

impl LlmEvaluator {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl EvaluateResponse for LlmEvaluator {
    async fn evaluate(
        &self,
        kind: InterviewKind,
        question: &str,
        response_text: &str,
        history: &[QaExchange],
    ) -> Evaluation {
        let prompt = build_evaluation_prompt(kind, question, response_text, history);
        let request = GenerationRequest::new(prompt)
            .with_system(prompts::EVALUATION_SYSTEM)
            .with_temperature(0.2)
            .with_max_tokens(800);

        match self.gateway.generate(request).await {
            Ok(text) => safe_parse_evaluation(kind, &text),
            Err(err) => {
                warn!("Evaluation degraded, all providers failed: {err}");
                Evaluation::fallback_for(kind, FallbackReason::ProviderExhausted)
            }
        }
    }
}
