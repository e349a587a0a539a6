use thiserror::Error;
use uuid::Uuid;

/// Engine-level error type surfaced to the boundary layer (HTTP/CLI shim).
///
/// Transient provider failures and parse failures never reach this enum:
/// the gateway absorbs them via chain fallback and the evaluator substitutes
/// a transparently-flagged default. A turn submitted to a COMPLETED session
/// is an idempotent read, not an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// A turn is already in flight for this session. Concurrent
    /// double-submission is rejected rather than left racy.
    #[error("Session {0} already has a turn in flight")]
    SessionBusy(Uuid),
}
