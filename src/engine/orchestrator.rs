use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analyzer::{AnalyzerFailure, CommitmentAnalyzer};
use crate::config::CoachConfig;
use crate::error::{CoachError, Result};
use crate::models::{DegradedCause, SessionOutcome, UserChoice};
use crate::persistence::{CommitmentStore, SaveSource, SavedCommitment};
use crate::session::{InMemorySessionStore, RetrySession, SessionPhase};
use crate::token;
use crate::transport::MessagingTransport;

use super::guidance;

/// Drives one commitment through up to `max_retries + 1` analysis rounds.
///
/// Each public operation checks the session out of the store, owns it
/// exclusively until the operation completes, and either restores it
/// (non-terminal) or lets it drop (terminal). Analyzer failures never reach
/// the caller: the commitment is saved with a fallback score instead, so an
/// unavailable scoring service can never block a user.
pub struct RetryOrchestrator<A, T, P>
where
    A: CommitmentAnalyzer,
    T: MessagingTransport,
    P: CommitmentStore,
{
    analyzer: A,
    transport: T,
    commitments: P,
    sessions: Arc<InMemorySessionStore>,
    config: CoachConfig,
}

impl<A, T, P> RetryOrchestrator<A, T, P>
where
    A: CommitmentAnalyzer,
    T: MessagingTransport,
    P: CommitmentStore,
{
    pub fn new(
        analyzer: A,
        transport: T,
        commitments: P,
        sessions: Arc<InMemorySessionStore>,
        config: CoachConfig,
    ) -> Self {
        Self {
            analyzer,
            transport,
            commitments,
            sessions,
            config,
        }
    }

    /// Shared handle to the session store, for wiring up the expiry sweeper.
    pub fn session_store(&self) -> Arc<InMemorySessionStore> {
        Arc::clone(&self.sessions)
    }

    // ------------------------------------------------------------------
    // Public surface
    // ------------------------------------------------------------------

    /// Open a new retry dialogue and run the first analysis round.
    pub async fn start_session(&self, user_id: &str, text: &str) -> Result<SessionOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoachError::EmptyCommitment);
        }

        let now = Utc::now();
        let session = RetrySession::new(token::mint(user_id, now), user_id, text, now);
        let session_id = session.session_id.clone();
        self.sessions.create(session)?;

        let Some(session) = self.sessions.checkout(&session_id) else {
            return Err(CoachError::SessionNotFound(session_id));
        };
        info!("Started session {} for user {}", session_id, user_id);
        self.run_round(session).await
    }

    /// Apply a button choice to a waiting session.
    pub async fn handle_choice(
        &self,
        session_id: &str,
        choice: UserChoice,
    ) -> Result<SessionOutcome> {
        let Some(mut session) = self.sessions.checkout(session_id) else {
            return Err(CoachError::SessionNotFound(session_id.to_string()));
        };

        let phase = session.phase.clone();
        match (phase, choice) {
            (SessionPhase::AwaitingChoice, UserChoice::RetryManual) => {
                session.touch(Utc::now());
                session.phase = SessionPhase::AwaitingRewrite;
                self.present(&session.user_id, guidance::REWRITE_PROMPT, &[])
                    .await;
                let outcome = SessionOutcome::AwaitingRewrite {
                    session_id: session.session_id.clone(),
                };
                self.sessions.restore(session);
                Ok(outcome)
            }

            (SessionPhase::AwaitingChoice, UserChoice::UseAiSuggestion) => {
                let Some(suggestion) = session.latest_attempt().map(|a| a.suggestion.clone())
                else {
                    return self.fail_corrupt(session);
                };
                session.touch(Utc::now());
                session.current_text = suggestion;
                session.attempt_count += 1;
                self.run_round(session).await
            }

            (SessionPhase::AwaitingChoice, UserChoice::KeepOriginal) => {
                session.touch(Utc::now());
                let record = SavedCommitment::new(
                    &session.user_id,
                    &session.original_text,
                    self.config.scoring.keep_original_score,
                    SaveSource::KeptOriginal,
                );
                self.finish_save(session, record).await
            }

            // The final prompt's "try the suggestion" deliberately skips
            // re-analysis: the retry budget is spent, so the suggestion text
            // is saved with the last recorded score.
            (SessionPhase::FinalChoice, UserChoice::UseAiSuggestion) => {
                let Some((suggestion, score)) = session
                    .latest_attempt()
                    .map(|a| (a.suggestion.clone(), a.score))
                else {
                    return self.fail_corrupt(session);
                };
                session.touch(Utc::now());
                session.current_text = suggestion;
                let record = SavedCommitment::new(
                    &session.user_id,
                    &session.current_text,
                    score,
                    SaveSource::FinalSave,
                );
                self.finish_save(session, record).await
            }

            (SessionPhase::FinalChoice, UserChoice::SaveFinal) => {
                let Some(score) = session.latest_attempt().map(|a| a.score) else {
                    return self.fail_corrupt(session);
                };
                session.touch(Utc::now());
                let record = SavedCommitment::new(
                    &session.user_id,
                    &session.current_text,
                    score,
                    SaveSource::FinalSave,
                );
                self.finish_save(session, record).await
            }

            (SessionPhase::PendingSave { text, score, source }, UserChoice::SaveFinal) => {
                session.touch(Utc::now());
                let record = SavedCommitment::new(&session.user_id, text, score, source);
                self.finish_save(session, record).await
            }

            (_, UserChoice::Cancel) => {
                info!("Session {} cancelled by user", session.session_id);
                self.present(&session.user_id, guidance::cancelled_message(), &[])
                    .await;
                // Checked out and not restored: the session is gone.
                Ok(SessionOutcome::Cancelled {
                    session_id: session.session_id,
                })
            }

            (phase, choice) => {
                let err = CoachError::InvalidTransition {
                    state: phase.describe().to_string(),
                    choice,
                };
                self.sessions.restore(session);
                Err(err)
            }
        }
    }

    /// Accept free-form replacement text for a session that asked for one.
    pub async fn submit_rewrite(&self, session_id: &str, text: &str) -> Result<SessionOutcome> {
        let Some(mut session) = self.sessions.checkout(session_id) else {
            return Err(CoachError::SessionNotFound(session_id.to_string()));
        };

        if session.phase != SessionPhase::AwaitingRewrite {
            // Stray text while no rewrite is pending; leave the session as-is.
            self.sessions.restore(session);
            return Err(CoachError::UnexpectedInput);
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            self.sessions.restore(session);
            return Err(CoachError::EmptyCommitment);
        }

        session.touch(Utc::now());
        session.current_text = text;
        session.attempt_count += 1;
        self.run_round(session).await
    }

    /// Drop sessions idle past the TTL. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let swept = self.sessions.sweep_expired(now, self.config.session_ttl());
        if !swept.is_empty() {
            info!("Swept {} expired session(s)", swept.len());
        }
        swept.len()
    }

    // ------------------------------------------------------------------
    // Analysis round
    // ------------------------------------------------------------------

    async fn run_round(&self, mut session: RetrySession) -> Result<SessionOutcome> {
        session.phase = SessionPhase::Analyzing;
        debug!(
            "Analyzing attempt {} for session {}",
            session.attempt_count, session.session_id
        );

        let analysis = match timeout(
            self.config.analyzer_timeout(),
            self.analyzer.analyze(&session.current_text),
        )
        .await
        {
            Err(_) => {
                warn!("Analyzer timed out for session {}", session.session_id);
                return self
                    .finish_degraded(session, DegradedCause::AnalyzerTimeout)
                    .await;
            }
            Ok(Err(AnalyzerFailure::Timeout)) => {
                warn!("Analyzer reported timeout for session {}", session.session_id);
                return self
                    .finish_degraded(session, DegradedCause::AnalyzerTimeout)
                    .await;
            }
            Ok(Err(failure)) => {
                warn!(
                    "Analysis failed for session {}: {}",
                    session.session_id, failure
                );
                return self
                    .finish_degraded(session, DegradedCause::AnalyzerError)
                    .await;
            }
            Ok(Ok(raw)) => match raw.validated() {
                Ok(analysis) => analysis,
                Err(failure) => {
                    warn!(
                        "Analyzer returned malformed result for session {}: {}",
                        session.session_id, failure
                    );
                    return self
                        .finish_degraded(session, DegradedCause::AnalyzerError)
                        .await;
                }
            },
        };

        session.record_attempt(&analysis, Utc::now());

        if analysis.score >= self.config.scoring.success_threshold {
            let record = SavedCommitment::new(
                &session.user_id,
                &session.current_text,
                analysis.score,
                SaveSource::Accepted,
            );
            return self.finish_save(session, record).await;
        }

        if session.attempt_count < self.config.retry.max_retries {
            session.phase = SessionPhase::AwaitingChoice;
            let prompt = match guidance::retry_prompt(session.attempt_count, &analysis) {
                Ok(prompt) => prompt,
                Err(err) => {
                    self.sessions.restore(session);
                    return Err(err);
                }
            };
            self.present(&session.user_id, &prompt, guidance::RETRY_CHOICES)
                .await;
            let outcome = SessionOutcome::AwaitingChoice {
                session_id: session.session_id.clone(),
                score: analysis.score,
                attempt_count: session.attempt_count,
                choices: guidance::RETRY_CHOICES.to_vec(),
            };
            self.sessions.restore(session);
            Ok(outcome)
        } else {
            // The retry budget is spent; no further analysis will run.
            session.phase = SessionPhase::FinalChoice;
            let prompt = match guidance::final_prompt(analysis.score, &session.current_text) {
                Ok(prompt) => prompt,
                Err(err) => {
                    self.sessions.restore(session);
                    return Err(err);
                }
            };
            self.present(&session.user_id, &prompt, guidance::FINAL_CHOICES)
                .await;
            let outcome = SessionOutcome::FinalChoice {
                session_id: session.session_id.clone(),
                score: analysis.score,
                choices: guidance::FINAL_CHOICES.to_vec(),
            };
            self.sessions.restore(session);
            Ok(outcome)
        }
    }

    // ------------------------------------------------------------------
    // Terminal paths
    // ------------------------------------------------------------------

    /// Fail-open: save with a fallback score instead of surfacing the
    /// analyzer failure. The attempt count is not incremented.
    async fn finish_degraded(
        &self,
        session: RetrySession,
        cause: DegradedCause,
    ) -> Result<SessionOutcome> {
        let (score, source) = match cause {
            DegradedCause::AnalyzerTimeout => (
                self.config.scoring.timeout_fallback_score,
                SaveSource::DegradedTimeout,
            ),
            DegradedCause::AnalyzerError => (
                self.config.scoring.error_fallback_score,
                SaveSource::DegradedError,
            ),
        };
        let record = SavedCommitment::new(&session.user_id, &session.current_text, score, source);
        self.finish_save(session, record).await
    }

    /// Persist `record` and close the session, or park it for a save retry.
    async fn finish_save(
        &self,
        mut session: RetrySession,
        record: SavedCommitment,
    ) -> Result<SessionOutcome> {
        match self.commitments.save(&record).await {
            Ok(()) => {
                self.present(&session.user_id, &guidance::saved_message(&record), &[])
                    .await;
                info!(
                    "Session {} closed ({:?}, score {:.1})",
                    session.session_id, record.source, record.score
                );
                // Checked out and not restored: removal is complete.
                Ok(Self::terminal_outcome(&session, &record))
            }
            Err(err) => {
                warn!(
                    "Persist failed for session {}: {}",
                    session.session_id, err
                );
                // Losing the session would lose the user's work; park the
                // payload so SaveFinal can retry it.
                session.phase = SessionPhase::PendingSave {
                    text: record.text.clone(),
                    score: record.score,
                    source: record.source,
                };
                let session_id = session.session_id.clone();
                self.sessions.restore(session);
                Err(CoachError::Persistence {
                    session_id,
                    message: err.0,
                })
            }
        }
    }

    fn terminal_outcome(session: &RetrySession, record: &SavedCommitment) -> SessionOutcome {
        let session_id = session.session_id.clone();
        match record.source {
            SaveSource::Accepted => SessionOutcome::Accepted {
                session_id,
                text: record.text.clone(),
                score: record.score,
                attempt_count: session.attempt_count,
            },
            SaveSource::DegradedTimeout => SessionOutcome::DegradedAccepted {
                session_id,
                text: record.text.clone(),
                score: record.score,
                cause: DegradedCause::AnalyzerTimeout,
            },
            SaveSource::DegradedError => SessionOutcome::DegradedAccepted {
                session_id,
                text: record.text.clone(),
                score: record.score,
                cause: DegradedCause::AnalyzerError,
            },
            SaveSource::KeptOriginal => SessionOutcome::KeptOriginal {
                session_id,
                text: record.text.clone(),
                score: record.score,
            },
            SaveSource::FinalSave => SessionOutcome::FinalSaved {
                session_id,
                text: record.text.clone(),
                score: record.score,
            },
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Fire-and-forget prompt delivery; a dead transport never fails a
    /// transition.
    async fn present(&self, user_id: &str, message: &str, choices: &[UserChoice]) {
        if let Err(err) = self.transport.present_prompt(user_id, message, choices).await {
            warn!("Prompt delivery failed for user {}: {}", user_id, err);
        }
    }

    /// A waiting session with no recorded attempt should be impossible;
    /// surface it as a typed error rather than panicking mid-dialogue.
    fn fail_corrupt(&self, session: RetrySession) -> Result<SessionOutcome> {
        let err = CoachError::NoAttemptRecorded(session.session_id.clone());
        self.sessions.restore(session);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SmartAnalysis;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedAnalyzer {
        scores: Mutex<VecDeque<f32>>,
    }

    impl ScriptedAnalyzer {
        fn new(scores: &[f32]) -> Self {
            Self {
                scores: Mutex::new(scores.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl CommitmentAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, text: &str) -> std::result::Result<SmartAnalysis, AnalyzerFailure> {
            let score = self
                .scores
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");
            Ok(SmartAnalysis::new(
                score,
                format!("{text} for 15 minutes by 8pm"),
                "tighten it up",
            ))
        }
    }

    struct NullTransport;

    #[async_trait]
    impl MessagingTransport for NullTransport {
        async fn present_prompt(
            &self,
            _user_id: &str,
            _message: &str,
            _choices: &[UserChoice],
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        saved: Mutex<Vec<SavedCommitment>>,
    }

    #[async_trait]
    impl CommitmentStore for MemoryLedger {
        async fn save(
            &self,
            record: &SavedCommitment,
        ) -> std::result::Result<(), crate::persistence::PersistenceError> {
            self.saved.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn orchestrator(
        scores: &[f32],
    ) -> RetryOrchestrator<ScriptedAnalyzer, NullTransport, MemoryLedger> {
        RetryOrchestrator::new(
            ScriptedAnalyzer::new(scores),
            NullTransport,
            MemoryLedger::default(),
            Arc::new(InMemorySessionStore::new()),
            CoachConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_threshold_is_a_closed_lower_bound() {
        let coach = orchestrator(&[8.0]);
        let outcome = coach.start_session("u1", "read").await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Accepted { score, .. } if score == 8.0));

        let coach = orchestrator(&[7.9]);
        let outcome = coach.start_session("u1", "read").await.unwrap();
        assert!(matches!(outcome, SessionOutcome::AwaitingChoice { .. }));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_any_session_exists() {
        let coach = orchestrator(&[]);
        assert!(matches!(
            coach.start_session("u1", "   ").await,
            Err(CoachError::EmptyCommitment)
        ));
        assert!(coach.session_store().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_choice_leaves_session_untouched() {
        let coach = orchestrator(&[4.0]);
        let outcome = coach.start_session("u1", "read a book").await.unwrap();
        let session_id = outcome.session_id().to_string();

        let before = coach.sessions.checkout(&session_id).unwrap();
        coach.sessions.restore(before.clone());

        let err = coach
            .handle_choice(&session_id, UserChoice::SaveFinal)
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::InvalidTransition { .. }));

        let after = coach.sessions.checkout(&session_id).unwrap();
        assert_eq!(after.current_text, before.current_text);
        assert_eq!(after.attempt_count, before.attempt_count);
        assert_eq!(after.attempts.len(), before.attempts.len());
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.last_activity, before.last_activity);
    }

    #[tokio::test]
    async fn test_unknown_session_reports_not_found() {
        let coach = orchestrator(&[]);
        assert!(matches!(
            coach.handle_choice("nope", UserChoice::Cancel).await,
            Err(CoachError::SessionNotFound(_))
        ));
        assert!(matches!(
            coach.submit_rewrite("nope", "text").await,
            Err(CoachError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_removes_without_saving() {
        let coach = orchestrator(&[4.0]);
        let outcome = coach.start_session("u1", "read a book").await.unwrap();
        let session_id = outcome.session_id().to_string();

        let outcome = coach
            .handle_choice(&session_id, UserChoice::Cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, SessionOutcome::Cancelled { .. }));
        assert!(coach.session_store().is_empty());
        assert!(coach.commitments.saved.lock().unwrap().is_empty());
    }
}
