use serde::{Deserialize, Serialize};

// ============================================================================
// User Choices
// ============================================================================

/// Actions a user can take when prompted between analysis rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserChoice {
    /// Type a replacement commitment by hand.
    RetryManual,
    /// Adopt the analyzer's suggested rewrite.
    UseAiSuggestion,
    /// Save the original text as first submitted.
    KeepOriginal,
    /// Save the current text with its last recorded score.
    SaveFinal,
    /// Abandon the session without saving anything.
    Cancel,
}

impl UserChoice {
    /// Short human label used when rendering choice menus.
    pub fn label(self) -> &'static str {
        match self {
            UserChoice::RetryManual => "Rewrite it myself",
            UserChoice::UseAiSuggestion => "Use the suggested version",
            UserChoice::KeepOriginal => "Keep my original",
            UserChoice::SaveFinal => "Save it as-is",
            UserChoice::Cancel => "Cancel",
        }
    }
}

impl std::fmt::Display for UserChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            UserChoice::RetryManual => "retry_manual",
            UserChoice::UseAiSuggestion => "use_ai_suggestion",
            UserChoice::KeepOriginal => "keep_original",
            UserChoice::SaveFinal => "save_final",
            UserChoice::Cancel => "cancel",
        };
        f.write_str(token)
    }
}

// ============================================================================
// Degraded Cause
// ============================================================================

/// Why an analysis round fell back to the degraded-save path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedCause {
    /// The analyzer did not answer within the configured timeout.
    AnalyzerTimeout,
    /// The analyzer returned an error or a malformed result.
    AnalyzerError,
}

// ============================================================================
// Session Outcome
// ============================================================================

/// Result of one call into the retry engine.
///
/// Terminal variants mean the session has been removed from the store (the
/// one exception is a persistence failure, which surfaces as an error and
/// parks the session instead). Non-terminal variants tell the caller what
/// input the dialogue is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The commitment scored at or above the acceptance threshold.
    Accepted {
        session_id: String,
        text: String,
        score: f32,
        attempt_count: u32,
    },
    /// The analyzer was unavailable; the commitment was saved with a
    /// fallback score rather than blocking the user.
    DegradedAccepted {
        session_id: String,
        text: String,
        score: f32,
        cause: DegradedCause,
    },
    /// Below threshold with retries left; the user has been shown a
    /// guidance prompt and must pick one of `choices`.
    AwaitingChoice {
        session_id: String,
        score: f32,
        attempt_count: u32,
        choices: Vec<UserChoice>,
    },
    /// The user chose to rewrite by hand; the next free-form text is the
    /// replacement commitment.
    AwaitingRewrite { session_id: String },
    /// The retry budget is exhausted; the user must pick one of `choices`.
    FinalChoice {
        session_id: String,
        score: f32,
        choices: Vec<UserChoice>,
    },
    /// The original text was saved with the fixed keep-original score.
    KeptOriginal {
        session_id: String,
        text: String,
        score: f32,
    },
    /// The current text was saved with its last recorded score.
    FinalSaved {
        session_id: String,
        text: String,
        score: f32,
    },
    /// The session was abandoned; nothing was persisted.
    Cancelled { session_id: String },
}

impl SessionOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionOutcome::Accepted { .. }
                | SessionOutcome::DegradedAccepted { .. }
                | SessionOutcome::KeptOriginal { .. }
                | SessionOutcome::FinalSaved { .. }
                | SessionOutcome::Cancelled { .. }
        )
    }

    pub fn session_id(&self) -> &str {
        match self {
            SessionOutcome::Accepted { session_id, .. }
            | SessionOutcome::DegradedAccepted { session_id, .. }
            | SessionOutcome::AwaitingChoice { session_id, .. }
            | SessionOutcome::AwaitingRewrite { session_id }
            | SessionOutcome::FinalChoice { session_id, .. }
            | SessionOutcome::KeptOriginal { session_id, .. }
            | SessionOutcome::FinalSaved { session_id, .. }
            | SessionOutcome::Cancelled { session_id } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        let accepted = SessionOutcome::Accepted {
            session_id: "s".into(),
            text: "t".into(),
            score: 9.0,
            attempt_count: 0,
        };
        assert!(accepted.is_terminal());

        let waiting = SessionOutcome::AwaitingChoice {
            session_id: "s".into(),
            score: 4.0,
            attempt_count: 0,
            choices: vec![UserChoice::RetryManual, UserChoice::Cancel],
        };
        assert!(!waiting.is_terminal());
        assert!(!SessionOutcome::AwaitingRewrite { session_id: "s".into() }.is_terminal());
    }

    #[test]
    fn test_choice_serde_snake_case() {
        let json = serde_json::to_string(&UserChoice::UseAiSuggestion).unwrap();
        assert_eq!(json, "\"use_ai_suggestion\"");
        let parsed: UserChoice = serde_json::from_str("\"save_final\"").unwrap();
        assert_eq!(parsed, UserChoice::SaveFinal);
    }

    #[test]
    fn test_outcome_json_tagged() {
        let outcome = SessionOutcome::Cancelled {
            session_id: "abc".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"cancelled\""));
    }
}
