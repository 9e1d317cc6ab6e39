use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration for the retry engine and its adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Hard bound on one analyzer call; past it the degraded path is taken.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Closed lower bound: a score equal to the threshold is accepted.
    pub success_threshold: f32,
    /// Score recorded when the analyzer times out.
    pub timeout_fallback_score: f32,
    /// Score recorded when the analyzer errors.
    pub error_fallback_score: f32,
    /// Fixed score for keep-original saves; the original is never re-scored.
    pub keep_original_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Analyses beyond the first. 3 means four analyzer calls total.
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session is silently dropped.
    pub ttl_minutes: i64,
    /// How often the background sweeper runs.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding `commitments.jsonl`.
    pub dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            success_threshold: 8.0,
            timeout_fallback_score: 6.0,
            error_fallback_score: 5.0,
            keep_original_score: 5.0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./ledger"),
        }
    }
}

impl CoachConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CoachConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if file doesn't exist.
    pub fn load_or_default(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    /// Apply `COMMIT_COACH_*` environment variable overrides.
    ///
    /// Unparseable values are ignored rather than fatal, so a stray variable
    /// can't take the bot down.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>("COMMIT_COACH_ANALYZER_TIMEOUT_SECS") {
            self.analyzer.timeout_secs = v;
        }
        if let Some(v) = env_parse::<f32>("COMMIT_COACH_SUCCESS_THRESHOLD") {
            self.scoring.success_threshold = v;
        }
        if let Some(v) = env_parse::<u32>("COMMIT_COACH_MAX_RETRIES") {
            self.retry.max_retries = v;
        }
        if let Some(v) = env_parse::<i64>("COMMIT_COACH_SESSION_TTL_MINUTES") {
            self.session.ttl_minutes = v;
        }
        if let Ok(v) = std::env::var("COMMIT_COACH_LEDGER_DIR") {
            self.ledger.dir = PathBuf::from(v);
        }
        self
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer.timeout_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session.ttl_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_product_rules() {
        let config = CoachConfig::default();
        assert_eq!(config.analyzer.timeout_secs, 15);
        assert_eq!(config.scoring.success_threshold, 8.0);
        assert_eq!(config.scoring.timeout_fallback_score, 6.0);
        assert_eq!(config.scoring.error_fallback_score, 5.0);
        assert_eq!(config.scoring.keep_original_score, 5.0);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.session.ttl_minutes, 30);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "retry:\n  max_retries: 2\n";
        let config: CoachConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.scoring.success_threshold, 8.0);
        assert_eq!(config.session.ttl_minutes, 30);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CoachConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: CoachConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.retry.max_retries, config.retry.max_retries);
        assert_eq!(parsed.ledger.dir, config.ledger.dir);
    }
}
