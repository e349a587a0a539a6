//! Interview State Machine — owns per-session state, question selection,
//! follow-up policy, completion detection, and summary generation.
//!
//! One generic machine drives every interview type; the differences live in
//! the [`profile::TypeProfile`] capability records. A turn never fails on an
//! LLM or parsing problem — degraded components substitute defaults and the
//! conversation continues.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

pub mod profile;
pub mod questions;
pub mod session;
pub mod summary;

use crate::context::ContextBuilder;
use crate::errors::EngineError;
use crate::evaluation::prompts::PERSONALIZE_QUESTION_TEMPLATE;
use crate::evaluation::{EvaluateResponse, Evaluation, StarComponent};
use crate::extract::extract_json;
use crate::llm_gateway::{GenerationRequest, LlmGateway};
use profile::{profile_for, FollowUpPolicy, InterviewKind, TypeProfile};
use questions::{detect_domain, select_question, Domain};
use session::{Phase, ResponseRecord, Session, SessionRegistry, SessionSnapshot};
use summary::{build_summary, InterviewSummary};

/// Hard cap on follow-ups per question index.
pub const MAX_FOLLOW_UPS: u8 = 2;

const STOP_PHRASES: &[&str] = &[
    "stop",
    "end",
    "that's all",
    "thats all",
    "quit",
    "exit",
    "i'm done",
    "im done",
    "end interview",
];

fn is_stop_phrase(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches(['.', '!']).trim().to_lowercase();
    STOP_PHRASES.contains(&normalized.as_str())
}

/// Inbound request to start an interview.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub kind: InterviewKind,
    pub resume_text: Option<String>,
    pub jd_text: Option<String>,
    /// Opaque analysis from a prior session, stored on the session untouched.
    pub prior_analysis: Option<serde_json::Value>,
    /// Overrides the type's default question budget.
    pub max_questions: Option<usize>,
    pub voice_enabled: bool,
}

impl CreateSessionRequest {
    pub fn new(user_id: impl Into<String>, kind: InterviewKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            resume_text: None,
            jd_text: None,
            prior_analysis: None,
            max_questions: None,
            voice_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub greeting: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Question,
    Completion,
}

/// The state machine's answer to one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub kind: TurnKind,
    pub message: String,
    pub evaluation: Option<Evaluation>,
    pub summary: Option<InterviewSummary>,
}

/// Top-level orchestrator. Constructed once at startup; components are
/// passed in explicitly.
pub struct InterviewEngine {
    gateway: Arc<LlmGateway>,
    context: Arc<ContextBuilder>,
    evaluator: Arc<dyn EvaluateResponse>,
    registry: SessionRegistry,
}

impl InterviewEngine {
    pub fn new(
        gateway: Arc<LlmGateway>,
        context: Arc<ContextBuilder>,
        evaluator: Arc<dyn EvaluateResponse>,
        max_sessions: usize,
    ) -> Self {
        Self {
            gateway,
            context,
            evaluator,
            registry: SessionRegistry::new(max_sessions),
        }
    }

    /// Starts a session and returns its greeting. Context population from
    /// resume/JD runs in the background, best-effort — a session never waits
    /// on (or fails because of) retrieval.
    pub fn create_session(&self, request: CreateSessionRequest) -> SessionHandle {
        let type_profile = profile_for(request.kind);
        let domain = match request.kind {
            InterviewKind::Technical => {
                detect_domain(request.jd_text.as_deref().unwrap_or_default())
            }
            _ => Domain::General,
        };

        let session = Session::new(
            request.user_id.clone(),
            request.kind,
            domain,
            request.max_questions.unwrap_or(type_profile.max_questions),
            request.prior_analysis,
            request.voice_enabled,
        );
        let handle = SessionHandle {
            session_id: session.id,
            greeting: type_profile.greeting.to_string(),
        };
        info!(
            "Created {} session {} for user {} (domain: {:?})",
            request.kind, session.id, request.user_id, domain
        );
        self.registry.insert(session);

        if request.resume_text.is_some() || request.jd_text.is_some() {
            let context = Arc::clone(&self.context);
            let user_id = request.user_id;
            let resume = request.resume_text;
            let jd = request.jd_text;
            tokio::spawn(async move {
                context
                    .rebuild_user_context(&user_id, resume.as_deref(), jd.as_deref())
                    .await;
            });
        }

        handle
    }

    /// Processes one user turn. Only session lookup can fail; everything
    /// downstream degrades instead of erroring.
    pub async fn submit_turn(
        &self,
        session_id: Uuid,
        user_text: &str,
    ) -> Result<TurnResult, EngineError> {
        let mut session = self.registry.checkout(session_id)?;
        let result = self.run_turn(&mut session, user_text).await;
        self.registry.checkin(session);
        Ok(result)
    }

    /// The persisted shape for the external persistence collaborator.
    pub fn snapshot(&self, session_id: Uuid) -> Result<SessionSnapshot, EngineError> {
        self.registry
            .with_session(session_id, |s| SessionSnapshot::from(s))
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    async fn run_turn(&self, session: &mut Session, user_text: &str) -> TurnResult {
        if session.phase == Phase::Completed {
            // Terminal state: idempotent read, no mutation.
            return TurnResult {
                kind: TurnKind::Completion,
                message: session
                    .completion_message
                    .clone()
                    .unwrap_or_else(|| profile_for(session.kind).completion_message.to_string()),
                evaluation: None,
                summary: session.summary.clone(),
            };
        }

        let now = Utc::now();
        session.last_activity = now;
        let type_profile = profile_for(session.kind);

        if is_stop_phrase(user_text) {
            info!("Session {} stopped by candidate", session.id);
            return self.finalize(session, type_profile, None);
        }

        if session.phase == Phase::Greeting {
            session.phase = Phase::InProgress;
            let question = self.next_question_text(session).await;
            session.questions_asked.push(question.clone());
            return TurnResult {
                kind: TurnKind::Question,
                message: question,
                evaluation: None,
                summary: None,
            };
        }

        let question = session
            .questions_asked
            .last()
            .cloned()
            .unwrap_or_default();
        let history = session.history();
        let evaluation = self
            .evaluator
            .evaluate(session.kind, &question, user_text, &history)
            .await;

        session.responses.push(ResponseRecord {
            question_index: session.current_question_index,
            question,
            response_text: user_text.to_string(),
            evaluation: evaluation.clone(),
            timestamp: now,
        });

        // Probe before advancing, bounded per question index.
        if session.follow_ups_for_current() < MAX_FOLLOW_UPS {
            if let Some(follow_up) = follow_up_question(
                type_profile.follow_up_policy,
                &evaluation,
                session.current_question_index,
            ) {
                *session
                    .follow_up_count
                    .entry(session.current_question_index)
                    .or_insert(0) += 1;
                session.questions_asked.push(follow_up.clone());
                debug!(
                    "Session {} follow-up {} on question {}",
                    session.id,
                    session.follow_ups_for_current(),
                    session.current_question_index
                );
                return TurnResult {
                    kind: TurnKind::Question,
                    message: follow_up,
                    evaluation: Some(evaluation),
                    summary: None,
                };
            }
        }

        session.current_question_index += 1;
        let out_of_questions = session.current_question_index >= session.max_questions;
        let out_of_time =
            now - session.started_at >= Duration::minutes(type_profile.duration_limit_minutes);
        if out_of_questions || out_of_time {
            return self.finalize(session, type_profile, Some(evaluation));
        }

        let question = self.next_question_text(session).await;
        session.questions_asked.push(question.clone());
        TurnResult {
            kind: TurnKind::Question,
            message: question,
            evaluation: Some(evaluation),
            summary: None,
        }
    }

    fn finalize(
        &self,
        session: &mut Session,
        type_profile: &TypeProfile,
        evaluation: Option<Evaluation>,
    ) -> TurnResult {
        let summary = build_summary(type_profile, &session.responses, session.questions_asked.len());
        session.phase = Phase::Completed;
        session.completed_at = Some(Utc::now());
        session.completion_message = Some(type_profile.completion_message.to_string());
        session.summary = Some(summary.clone());
        info!(
            "Session {} completed: {} response(s), overall {:.2}",
            session.id,
            session.responses.len(),
            summary.overall_score
        );
        TurnResult {
            kind: TurnKind::Completion,
            message: type_profile.completion_message.to_string(),
            evaluation,
            summary: Some(summary),
        }
    }

    /// Next bank question under the rotation policy, personalized from the
    /// candidate's context when available.
    async fn next_question_text(&self, session: &Session) -> String {
        let selected = select_question(
            session.kind,
            session.current_question_index,
            session.max_questions,
            session.detected_domain,
        );
        if let Some(personalized) = self
            .personalize_question(&session.user_id, selected.category, selected.text)
            .await
        {
            return personalized;
        }
        selected.text.to_string()
    }

    /// Best-effort rewrite against retrieved resume/JD excerpts. Any failure
    /// along the way silently falls back to the bank question.
    async fn personalize_question(
        &self,
        user_id: &str,
        topic: &str,
        question: &str,
    ) -> Option<String> {
        if !self.context.has_context(user_id) {
            return None;
        }
        let block = self.context.query_context(user_id, topic, None, 3).await?;
        let prompt = PERSONALIZE_QUESTION_TEMPLATE
            .replace("{context}", &block)
            .replace("{question}", question);
        let text = self
            .gateway
            .generate(
                GenerationRequest::new(prompt)
                    .with_temperature(0.4)
                    .with_max_tokens(200),
            )
            .await
            .ok()?;
        extract_json(&text)?
            .get("question")?
            .as_str()
            .map(str::to_string)
    }
}

fn follow_up_question(
    policy: FollowUpPolicy,
    evaluation: &Evaluation,
    question_index: usize,
) -> Option<String> {
    match policy {
        FollowUpPolicy::MissingStarComponent => evaluation
            .missing_component
            .map(|component| star_follow_up(component).to_string()),
        FollowUpPolicy::VaguenessProbe => evaluation.needs_clarification.then(|| {
            "Could you make that more concrete? A specific example with names, \
             numbers, or dates would help."
                .to_string()
        }),
        FollowUpPolicy::EvenIndexUnresolvedTopic => {
            if question_index % 2 != 0 {
                return None;
            }
            evaluation.unresolved_topics.first().map(|topic| {
                format!(
                    "You mentioned {topic} but didn't go deeper — can you walk me \
                     through how that works?"
                )
            })
        }
    }
}

fn star_follow_up(component: StarComponent) -> &'static str {
    match component {
        StarComponent::Situation => {
            "Let's add some context — what was the situation you were operating in?"
        }
        StarComponent::Task => "What exactly were you responsible for in that situation?",
        StarComponent::Action => "Walk me through the specific actions you personally took.",
        StarComponent::Result => "And what was the result? Concrete outcomes or numbers help.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{
        EmbeddingClient, EmbeddingError, EmbeddingProviderId, EmbeddingTransport,
    };
    use crate::evaluation::QaExchange;
    use crate::llm_gateway::providers::{ProviderDescriptor, ProviderError, ProviderTransport};
    use crate::llm_gateway::GatewayConfig;
    use crate::vector::VectorIndex;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    struct NoProvider;

    #[async_trait]
    impl ProviderTransport for NoProvider {
        async fn complete(
            &self,
            _provider: &ProviderDescriptor,
            _request: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                status: 503,
                message: "offline".to_string(),
            })
        }
    }

    struct NoEmbedder;

    #[async_trait]
    impl EmbeddingTransport for NoEmbedder {
        async fn embed(
            &self,
            _provider: EmbeddingProviderId,
            _texts: &[String],
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Api {
                status: 503,
                message: "offline".to_string(),
            })
        }
    }

    /// Pops scripted evaluations in order; returns a clean default when the
    /// script runs out.
    struct ScriptedEvaluator {
        script: Mutex<VecDeque<Evaluation>>,
        calls: Mutex<usize>,
    }

    impl ScriptedEvaluator {
        fn new(script: Vec<Evaluation>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            })
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl EvaluateResponse for ScriptedEvaluator {
        async fn evaluate(
            &self,
            _kind: InterviewKind,
            _question: &str,
            _response_text: &str,
            _history: &[QaExchange],
        ) -> Evaluation {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(clean_eval)
        }
    }

    fn clean_eval() -> Evaluation {
        Evaluation {
            scores: BTreeMap::from([
                ("structure".to_string(), 4.0),
                ("impact".to_string(), 4.0),
            ]),
            strengths: vec!["clear".to_string()],
            growth_areas: Vec::new(),
            missing_component: None,
            needs_clarification: false,
            unresolved_topics: Vec::new(),
            fallback: false,
            fallback_reason: None,
        }
    }

    fn engine(evaluator: Arc<dyn EvaluateResponse>) -> InterviewEngine {
        let gateway = Arc::new(LlmGateway::new(
            Arc::new(NoProvider),
            GatewayConfig {
                cost_optimized: false,
                gemini_configured: false,
                groq_configured: false,
                gemini_daily_free_quota: 0,
            },
        ));
        let index = Arc::new(VectorIndex::new());
        let embeddings = Arc::new(EmbeddingClient::new(Arc::new(NoEmbedder), false));
        let context = Arc::new(ContextBuilder::new(embeddings, index));
        InterviewEngine::new(gateway, context, evaluator, 10)
    }

    fn request(kind: InterviewKind, max_questions: usize) -> CreateSessionRequest {
        let mut r = CreateSessionRequest::new("user-1", kind);
        r.max_questions = Some(max_questions);
        r
    }

    #[tokio::test]
    async fn test_three_question_budget_completes_after_three_advances() {
        let evaluator = ScriptedEvaluator::new(Vec::new());
        let engine = engine(evaluator.clone());
        let handle = engine.create_session(request(InterviewKind::Behavioral, 3));
        assert!(!handle.greeting.is_empty());

        // Greeting reply yields the first question without evaluation.
        let first = engine.submit_turn(handle.session_id, "hello").await.unwrap();
        assert_eq!(first.kind, TurnKind::Question);
        assert!(first.evaluation.is_none());
        assert_eq!(evaluator.call_count(), 0);

        // Two answers advance; the third hits the budget and completes.
        for _ in 0..2 {
            let turn = engine
                .submit_turn(handle.session_id, "A solid detailed answer.")
                .await
                .unwrap();
            assert_eq!(turn.kind, TurnKind::Question);
            assert!(turn.evaluation.is_some());
        }
        let last = engine
            .submit_turn(handle.session_id, "A final answer.")
            .await
            .unwrap();
        assert_eq!(last.kind, TurnKind::Completion);
        let summary = last.summary.unwrap();
        assert_eq!(summary.responses_evaluated, 3);

        let snapshot = engine.snapshot(handle.session_id).unwrap();
        assert_eq!(snapshot.current_question_index, 3);
        assert_eq!(snapshot.questions.len(), 3);
        assert_eq!(snapshot.responses.len(), 3);
    }

    #[tokio::test]
    async fn test_behavioral_missing_result_triggers_exactly_one_follow_up() {
        let mut flagged = clean_eval();
        flagged.missing_component = Some(StarComponent::Result);
        let evaluator = ScriptedEvaluator::new(vec![flagged]);
        let engine = engine(evaluator);

        let handle = engine.create_session(request(InterviewKind::Behavioral, 3));
        engine.submit_turn(handle.session_id, "hello").await.unwrap();

        let probe = engine
            .submit_turn(handle.session_id, "I led a project and fixed a bug")
            .await
            .unwrap();
        assert_eq!(probe.kind, TurnKind::Question);
        assert!(probe.message.contains("result"));
        // Index did not advance; the follow-up was appended.
        let snapshot = engine.snapshot(handle.session_id).unwrap();
        assert_eq!(snapshot.current_question_index, 0);
        assert_eq!(snapshot.questions.len(), 2);

        // Clean answer to the follow-up advances the index.
        let next = engine
            .submit_turn(handle.session_id, "We cut page load by 40%.")
            .await
            .unwrap();
        assert_eq!(next.kind, TurnKind::Question);
        let snapshot = engine.snapshot(handle.session_id).unwrap();
        assert_eq!(snapshot.current_question_index, 1);

        // Run to completion and check the summary contract.
        let mut last = None;
        for _ in 0..4 {
            let turn = engine
                .submit_turn(handle.session_id, "Another detailed answer.")
                .await
                .unwrap();
            let done = turn.kind == TurnKind::Completion;
            last = Some(turn);
            if done {
                break;
            }
        }
        let summary = last.unwrap().summary.expect("completion carries a summary");
        assert!(!summary.recommendation.is_empty());
        for average in summary.dimension_averages.values() {
            assert!((1.0..=5.0).contains(average));
        }
    }

    #[tokio::test]
    async fn test_follow_ups_capped_at_two_per_question() {
        let mut flagged = clean_eval();
        flagged.missing_component = Some(StarComponent::Action);
        let evaluator =
            ScriptedEvaluator::new(vec![flagged.clone(), flagged.clone(), flagged.clone()]);
        let engine = engine(evaluator);

        let handle = engine.create_session(request(InterviewKind::Behavioral, 4));
        engine.submit_turn(handle.session_id, "hello").await.unwrap();

        // Two flagged answers produce two follow-ups on index 0.
        for expected_questions in [2, 3] {
            let turn = engine.submit_turn(handle.session_id, "vague").await.unwrap();
            assert_eq!(turn.kind, TurnKind::Question);
            let snapshot = engine.snapshot(handle.session_id).unwrap();
            assert_eq!(snapshot.current_question_index, 0);
            assert_eq!(snapshot.questions.len(), expected_questions);
        }

        // Third flagged answer: cap reached, index advances anyway.
        engine.submit_turn(handle.session_id, "still vague").await.unwrap();
        let snapshot = engine.snapshot(handle.session_id).unwrap();
        assert_eq!(snapshot.current_question_index, 1);
    }

    #[tokio::test]
    async fn test_completed_session_is_idempotent() {
        let evaluator = ScriptedEvaluator::new(Vec::new());
        let engine = engine(evaluator);
        let handle = engine.create_session(request(InterviewKind::Screening, 1));

        engine.submit_turn(handle.session_id, "hello").await.unwrap();
        let done = engine.submit_turn(handle.session_id, "My answer.").await.unwrap();
        assert_eq!(done.kind, TurnKind::Completion);

        let before = engine.snapshot(handle.session_id).unwrap();
        let again = engine.submit_turn(handle.session_id, "Hello again?").await.unwrap();
        assert_eq!(again.kind, TurnKind::Completion);
        assert_eq!(again.message, done.message);
        assert!(again.summary.is_some());

        let after = engine.snapshot(handle.session_id).unwrap();
        assert_eq!(after.responses.len(), before.responses.len());
        assert_eq!(after.current_question_index, before.current_question_index);
    }

    #[tokio::test]
    async fn test_stop_phrase_finalizes_without_evaluation() {
        let evaluator = ScriptedEvaluator::new(Vec::new());
        let engine = engine(evaluator.clone());
        let handle = engine.create_session(request(InterviewKind::Behavioral, 5));

        engine.submit_turn(handle.session_id, "hello").await.unwrap();
        let done = engine.submit_turn(handle.session_id, "That's all.").await.unwrap();
        assert_eq!(done.kind, TurnKind::Completion);
        assert!(done.summary.is_some());
        assert_eq!(evaluator.call_count(), 0);
        assert!(engine.snapshot(handle.session_id).unwrap().responses.is_empty());
    }

    #[tokio::test]
    async fn test_screening_follow_up_driven_by_vagueness_not_length() {
        let mut vague = clean_eval();
        vague.needs_clarification = true;
        let evaluator = ScriptedEvaluator::new(vec![vague]);
        let engine = engine(evaluator);

        let handle = engine.create_session(request(InterviewKind::Screening, 4));
        engine.submit_turn(handle.session_id, "hello").await.unwrap();

        // A long answer still draws a probe when the evaluator judged it vague.
        let long_but_vague = "I have done many things across many teams and I am \
            generally regarded as someone who gets things done in most situations."
            .to_string();
        let probe = engine
            .submit_turn(handle.session_id, &long_but_vague)
            .await
            .unwrap();
        assert!(probe.message.contains("concrete"));
        assert_eq!(
            engine.snapshot(handle.session_id).unwrap().current_question_index,
            0
        );
    }

    #[tokio::test]
    async fn test_technical_follow_up_fires_only_on_even_indices() {
        let mut unresolved = clean_eval();
        unresolved.unresolved_topics = vec!["connection pooling".to_string()];
        let clean = clean_eval();
        let evaluator = ScriptedEvaluator::new(vec![
            unresolved.clone(), // index 0 (even): probe fires
            clean,              // answer to the probe: advance to index 1
            unresolved,         // index 1 (odd): no probe, advance to index 2
        ]);
        let engine = engine(evaluator);

        let handle = engine.create_session(request(InterviewKind::Technical, 6));
        engine.submit_turn(handle.session_id, "hello").await.unwrap();

        let probe = engine.submit_turn(handle.session_id, "We pool connections.").await.unwrap();
        assert!(probe.message.contains("connection pooling"));
        assert_eq!(
            engine.snapshot(handle.session_id).unwrap().current_question_index,
            0
        );

        engine.submit_turn(handle.session_id, "Pools cap open sockets.").await.unwrap();
        assert_eq!(
            engine.snapshot(handle.session_id).unwrap().current_question_index,
            1
        );

        // Same unresolved signal on an odd index does not probe.
        engine.submit_turn(handle.session_id, "Another answer.").await.unwrap();
        assert_eq!(
            engine.snapshot(handle.session_id).unwrap().current_question_index,
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_session_surfaces_not_found() {
        let engine = engine(ScriptedEvaluator::new(Vec::new()));
        let err = engine.submit_turn(Uuid::new_v4(), "hello").await.unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }

    #[test]
    fn test_stop_phrase_normalization() {
        assert!(is_stop_phrase("stop"));
        assert!(is_stop_phrase("  That's all.  "));
        assert!(is_stop_phrase("END"));
        assert!(!is_stop_phrase("stop me if you've heard this one"));
    }

    #[tokio::test]
    async fn test_technical_session_caches_detected_domain() {
        let engine = engine(ScriptedEvaluator::new(Vec::new()));
        let mut req = request(InterviewKind::Technical, 4);
        req.jd_text = Some("Backend role: REST API servers and database work.".to_string());
        let handle = engine.create_session(req);

        let first = engine.submit_turn(handle.session_id, "hello").await.unwrap();
        // First backend topic at basic difficulty.
        assert!(first.message.contains("idempotency"));
    }
}
