//! Commitment ledger seam.
//!
//! The engine makes exactly one `save` call per terminal session and never
//! retries internally; a failed save surfaces to the caller with the session
//! parked for a retry.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

// ============================================================================
// Saved Commitment
// ============================================================================

/// How a saved commitment reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveSource {
    /// Scored at or above the acceptance threshold.
    Accepted,
    /// Analyzer timed out; saved with the timeout fallback score.
    DegradedTimeout,
    /// Analyzer errored; saved with the error fallback score.
    DegradedError,
    /// User kept the original text; saved with the fixed keep-original score.
    KeptOriginal,
    /// User saved from the final-choice prompt with the last recorded score.
    FinalSave,
}

/// One record in the commitment ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCommitment {
    pub user_id: String,
    pub text: String,
    pub score: f32,
    pub source: SaveSource,
    pub saved_at: DateTime<Utc>,
}

impl SavedCommitment {
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        score: f32,
        source: SaveSource,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            score,
            source,
            saved_at: Utc::now(),
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PersistenceError(pub String);

/// Durable store for finally-accepted commitments.
#[async_trait]
pub trait CommitmentStore: Send + Sync {
    async fn save(&self, record: &SavedCommitment) -> Result<(), PersistenceError>;
}

// ============================================================================
// JSONL Ledger
// ============================================================================

/// Appends one JSON line per saved commitment to `<dir>/commitments.jsonl`.
pub struct JsonlCommitmentStore {
    dir: PathBuf,
}

impl JsonlCommitmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join("commitments.jsonl")
    }
}

#[async_trait]
impl CommitmentStore for JsonlCommitmentStore {
    async fn save(&self, record: &SavedCommitment) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError(format!("create ledger dir: {e}")))?;

        let line = serde_json::to_string(record)
            .map_err(|e| PersistenceError(format!("encode record: {e}")))?;

        let path = self.ledger_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError(format!("open ledger: {e}")))?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| PersistenceError(format!("write ledger: {e}")))?;

        info!("Saved commitment for {} to {:?}", record.user_id, path);
        Ok(())
    }
}
