use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AttemptRecord, SmartAnalysis};
use crate::persistence::SaveSource;

// ============================================================================
// Session Phase
// ============================================================================

/// Where a retry dialogue currently stands.
///
/// Typed replacement for the source system's `awaitingFreeformInput` flag
/// plus the implicit states encoded in its callback payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// An analysis round is in flight. Transient: sessions in this phase are
    /// checked out of the store and never observable between calls.
    Analyzing,
    /// Below threshold with retries left; waiting for a button choice.
    AwaitingChoice,
    /// Waiting for the user to type a replacement commitment.
    AwaitingRewrite,
    /// Retry budget exhausted; waiting for save-as-is / suggestion / cancel.
    FinalChoice,
    /// A terminal save failed; the payload is retained so `SaveFinal` can
    /// retry it without losing the user's work.
    PendingSave {
        text: String,
        score: f32,
        source: SaveSource,
    },
}

impl SessionPhase {
    /// Short name used in `InvalidTransition` messages.
    pub fn describe(&self) -> &'static str {
        match self {
            SessionPhase::Analyzing => "analyzing",
            SessionPhase::AwaitingChoice => "awaiting a choice",
            SessionPhase::AwaitingRewrite => "awaiting a rewrite",
            SessionPhase::FinalChoice => "at the final choice",
            SessionPhase::PendingSave { .. } => "awaiting a save retry",
        }
    }
}

// ============================================================================
// Retry Session
// ============================================================================

/// State of one in-flight retry dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySession {
    pub session_id: String,
    pub user_id: String,
    /// The commitment as first submitted; immutable once the session starts.
    pub original_text: String,
    /// The text currently under evaluation.
    pub current_text: String,
    /// Analyses beyond the first. Never exceeds the retry budget (3).
    pub attempt_count: u32,
    /// Append-only audit trail; insertion order is chronological.
    pub attempts: Vec<AttemptRecord>,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    /// Refreshed on every mutation; drives the expiry sweep.
    pub last_activity: DateTime<Utc>,
}

impl RetrySession {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let text = text.into();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            original_text: text.clone(),
            current_text: text,
            attempt_count: 0,
            attempts: Vec::new(),
            phase: SessionPhase::Analyzing,
            started_at: now,
            last_activity: now,
        }
    }

    /// Append the result of a completed analysis to the audit trail.
    ///
    /// Keeps the `attempts.len() == attempt_count + 1` invariant: the record
    /// number is the current `attempt_count`, which the caller bumps before
    /// each re-analysis.
    pub fn record_attempt(&mut self, analysis: &SmartAnalysis, now: DateTime<Utc>) {
        self.attempts.push(AttemptRecord::new(
            self.attempt_count,
            self.current_text.clone(),
            analysis,
            now,
        ));
        self.touch(now);
    }

    pub fn latest_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(score: f32) -> SmartAnalysis {
        SmartAnalysis::new(score, "I will read 10 pages by 8pm", "add a deadline")
    }

    #[test]
    fn test_new_session_starts_clean() {
        let now = Utc::now();
        let session = RetrySession::new("s1", "u1", "read a book", now);
        assert_eq!(session.attempt_count, 0);
        assert!(session.attempts.is_empty());
        assert_eq!(session.original_text, session.current_text);
        assert_eq!(session.phase, SessionPhase::Analyzing);
    }

    #[test]
    fn test_record_attempt_keeps_audit_invariant() {
        let now = Utc::now();
        let mut session = RetrySession::new("s1", "u1", "read a book", now);

        session.record_attempt(&analysis(4.0), now);
        assert_eq!(session.attempts.len() as u32, session.attempt_count + 1);

        session.attempt_count += 1;
        session.current_text = "I will read 10 pages".to_string();
        session.record_attempt(&analysis(6.0), now);
        assert_eq!(session.attempts.len() as u32, session.attempt_count + 1);
        assert_eq!(session.attempts[1].number, 1);
        assert_eq!(session.attempts[1].text, "I will read 10 pages");
    }

    #[test]
    fn test_expiry_threshold() {
        let now = Utc::now();
        let session = RetrySession::new("s1", "u1", "read a book", now);
        let ttl = Duration::minutes(30);
        assert!(!session.is_expired(now + Duration::minutes(29), ttl));
        assert!(session.is_expired(now + Duration::minutes(31), ttl));
    }
}
