mod heuristic;

pub use heuristic::HeuristicAnalyzer;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::SmartAnalysis;

/// Failure modes of an analyzer call.
///
/// These never reach library callers: the engine converts every one of them
/// into the fail-open degraded-save path, so an unreachable scoring oracle
/// can never block a user from saving a commitment.
#[derive(Debug, Error)]
pub enum AnalyzerFailure {
    #[error("analyzer timed out")]
    Timeout,

    #[error("analysis failed: {0}")]
    Failed(String),

    #[error("malformed analysis result: {0}")]
    Malformed(String),
}

/// Scoring oracle for commitment texts.
///
/// Implementations wrap whatever actually does the scoring (an LLM service,
/// a remote API, the bundled heuristic). The engine applies its own timeout
/// around `analyze`, so implementations are free to block for as long as
/// their backend takes.
#[async_trait]
pub trait CommitmentAnalyzer: Send + Sync {
    /// Score `text` on the 0-10 SMART scale and propose a rewrite.
    async fn analyze(&self, text: &str) -> Result<SmartAnalysis, AnalyzerFailure>;
}
