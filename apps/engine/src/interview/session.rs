//! Session state and the in-memory session registry.
//!
//! The registry is the single coordination point for per-session access: a
//! turn checks its session out (leaving a busy marker) and checks it back in
//! when done, so a concurrent second turn on the same session is rejected as
//! a conflict instead of racing.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::evaluation::{Evaluation, QaExchange};
use crate::interview::profile::{profile_for, InterviewKind};
use crate::interview::questions::Domain;
use crate::interview::summary::InterviewSummary;

/// In-progress sessions idle longer than this are eviction candidates.
/// Completed sessions are kept longer, per the type's retention.
const ACTIVE_IDLE_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Greeting,
    InProgress,
    Completed,
}

/// One answered question. Owned by the session; never mutated once pushed.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub question_index: usize,
    pub question: String,
    pub response_text: String,
    pub evaluation: Evaluation,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub kind: InterviewKind,
    pub phase: Phase,
    /// Monotonic non-decreasing; follow-ups do not advance it.
    pub current_question_index: usize,
    pub max_questions: usize,
    /// Append-only; includes follow-up questions.
    pub questions_asked: Vec<String>,
    pub responses: Vec<ResponseRecord>,
    /// Follow-ups issued per question index; each entry stays ≤ 2.
    pub follow_up_count: HashMap<usize, u8>,
    /// Technical interviews: keyword-matched once from the JD, then reused.
    pub detected_domain: Domain,
    /// Opaque analysis from a prior session, carried for the boundary layer
    /// and report aggregation; the state machine does not interpret it.
    pub prior_analysis: Option<serde_json::Value>,
    pub voice_enabled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
    /// Cached on completion so repeat turns are idempotent reads.
    pub completion_message: Option<String>,
    pub summary: Option<InterviewSummary>,
}

impl Session {
    pub fn new(
        user_id: String,
        kind: InterviewKind,
        domain: Domain,
        max_questions: usize,
        prior_analysis: Option<serde_json::Value>,
        voice_enabled: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            phase: Phase::Greeting,
            current_question_index: 0,
            max_questions,
            questions_asked: Vec::new(),
            responses: Vec::new(),
            follow_up_count: HashMap::new(),
            detected_domain: domain,
            prior_analysis,
            voice_enabled,
            started_at: now,
            completed_at: None,
            last_activity: now,
            completion_message: None,
            summary: None,
        }
    }

    /// Prior exchanges, oldest first, for evaluator context.
    pub fn history(&self) -> Vec<QaExchange> {
        self.responses
            .iter()
            .map(|r| QaExchange {
                question: r.question.clone(),
                answer: r.response_text.clone(),
            })
            .collect()
    }

    pub fn follow_ups_for_current(&self) -> u8 {
        self.follow_up_count
            .get(&self.current_question_index)
            .copied()
            .unwrap_or(0)
    }
}

/// The shape handed to the external persistence collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub user_id: String,
    pub interview_type: InterviewKind,
    pub status: Phase,
    pub current_question_index: usize,
    pub questions: Vec<String>,
    pub responses: Vec<ResponseRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub voice_enabled: bool,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id.clone(),
            interview_type: session.kind,
            status: session.phase,
            current_question_index: session.current_question_index,
            questions: session.questions_asked.clone(),
            responses: session.responses.clone(),
            started_at: session.started_at,
            completed_at: session.completed_at,
            voice_enabled: session.voice_enabled,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Idle(Box<Session>),
    Busy,
}

/// Per-session map behind one coordinating component (no per-session locks
/// leak into call sites).
pub struct SessionRegistry {
    max_sessions: usize,
    slots: Mutex<HashMap<Uuid, Slot>>,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a new session. Eviction runs opportunistically here — there
    /// is no background timer.
    pub fn insert(&self, session: Session) {
        self.insert_at(session, Utc::now());
    }

    pub(crate) fn insert_at(&self, session: Session, now: DateTime<Utc>) {
        let mut slots = self.lock();
        Self::evict_expired(&mut slots, now);
        if slots.len() >= self.max_sessions {
            Self::evict_oldest(&mut slots, self.max_sessions);
        }
        slots.insert(session.id, Slot::Idle(Box::new(session)));
    }

    fn evict_expired(slots: &mut HashMap<Uuid, Slot>, now: DateTime<Utc>) {
        slots.retain(|id, slot| {
            let Slot::Idle(session) = slot else {
                return true; // never evict a session mid-turn
            };
            let idle = now - session.last_activity;
            let keep = match session.phase {
                Phase::Completed => {
                    idle < Duration::minutes(profile_for(session.kind).completed_retention_minutes)
                }
                _ => idle < Duration::minutes(ACTIVE_IDLE_MINUTES),
            };
            if !keep {
                debug!("Evicting session {id} ({:?}, idle {}m)", session.phase, idle.num_minutes());
            }
            keep
        });
    }

    /// Forced eviction when the live count hits the cap: oldest by last
    /// activity first.
    fn evict_oldest(slots: &mut HashMap<Uuid, Slot>, cap: usize) {
        while slots.len() >= cap {
            let oldest = slots
                .iter()
                .filter_map(|(id, slot)| match slot {
                    Slot::Idle(session) => Some((*id, session.last_activity)),
                    Slot::Busy => None,
                })
                .min_by_key(|(_, last_activity)| *last_activity)
                .map(|(id, _)| id);
            match oldest {
                Some(id) => {
                    debug!("Capacity eviction of session {id}");
                    slots.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Takes exclusive ownership of a session for one turn, leaving a busy
    /// marker. A second checkout before checkin is a conflict.
    pub fn checkout(&self, id: Uuid) -> Result<Session, EngineError> {
        let mut slots = self.lock();
        match slots.get_mut(&id) {
            None => Err(EngineError::SessionNotFound(id)),
            Some(slot) => match std::mem::replace(slot, Slot::Busy) {
                Slot::Idle(session) => Ok(*session),
                Slot::Busy => Err(EngineError::SessionBusy(id)),
            },
        }
    }

    /// Returns a session taken with [`checkout`].
    pub fn checkin(&self, session: Session) {
        self.lock().insert(session.id, Slot::Idle(Box::new(session)));
    }

    /// Read-only access without taking ownership; fails while a turn is in
    /// flight.
    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&Session) -> T,
    ) -> Result<T, EngineError> {
        let slots = self.lock();
        match slots.get(&id) {
            None => Err(EngineError::SessionNotFound(id)),
            Some(Slot::Busy) => Err(EngineError::SessionBusy(id)),
            Some(Slot::Idle(session)) => Ok(f(session)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.slots.lock().expect("session registry mutex poisoned")
    }
}
