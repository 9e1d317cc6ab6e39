mod settings;

pub use settings::{
    AnalyzerConfig, CoachConfig, LedgerConfig, RetryConfig, ScoringConfig, SessionConfig,
};
