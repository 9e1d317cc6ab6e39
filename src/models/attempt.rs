use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SmartAnalysis;

/// One scored analysis attempt, kept in the session's append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 0-indexed attempt number; equals the session's `attempt_count` at the
    /// time the analysis ran.
    pub number: u32,
    /// The commitment text that was analyzed.
    pub text: String,
    pub score: f32,
    pub suggestion: String,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(
        number: u32,
        text: impl Into<String>,
        analysis: &SmartAnalysis,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            text: text.into(),
            score: analysis.score,
            suggestion: analysis.suggestion.clone(),
            feedback: analysis.feedback.clone(),
            timestamp,
        }
    }
}
