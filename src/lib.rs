pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod persistence;
pub mod session;
pub mod sweeper;
pub mod token;
pub mod transport;

// Re-export main types
pub use analyzer::{AnalyzerFailure, CommitmentAnalyzer, HeuristicAnalyzer};
pub use config::CoachConfig;
pub use engine::RetryOrchestrator;
pub use error::{CoachError, Result};
pub use models::{AttemptRecord, DegradedCause, SessionOutcome, SmartAnalysis, UserChoice};
pub use persistence::{
    CommitmentStore, JsonlCommitmentStore, PersistenceError, SaveSource, SavedCommitment,
};
pub use session::{InMemorySessionStore, RetrySession, SessionPhase};
pub use sweeper::spawn_sweeper;
pub use transport::{ConsoleTransport, MessagingTransport};
