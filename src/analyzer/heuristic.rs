//! Rule-based SMART scoring.
//!
//! A deterministic fallback oracle: pattern tables detect each SMART
//! criterion and the score is the sum of the satisfied ones. Used by the CLI
//! and as the default analyzer when no remote scoring service is wired in.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SmartAnalysis;

use super::{AnalyzerFailure, CommitmentAnalyzer};

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+(\.\d+)?\b|\b(one|two|three|four|five|ten|once|twice)\b")
        .expect("invalid quantity pattern")
});

static TIME_BOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(by|before|until)\b|\b\d{1,2}(:\d{2})?\s*(am|pm)\b|\b(today|tonight|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday|this week|this weekend)\b",
    )
    .expect("invalid time pattern")
});

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(i\s+(will|am going to)\s+|i'll\s+)?(read|write|run|walk|call|email|text|finish|complete|practice|study|review|clean|cook|meditate|exercise|draft|send|plan|prepare|submit|publish|stretch|journal|organize|schedule|record|outline|apply|book|ship)\b",
    )
    .expect("invalid verb pattern")
});

static INTENT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(i\s+will\s+|i\s+am\s+going\s+to\s+|i'll\s+)").expect("invalid prefix pattern"));

static LARGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4,}\b").expect("invalid magnitude pattern"));

/// Per-criterion weights. The maximum reachable score is exactly 10.0.
const BASE_SCORE: f32 = 2.0;
const SPECIFIC_WEIGHT: f32 = 2.0;
const MEASURABLE_WEIGHT: f32 = 2.5;
const TIME_BOUND_WEIGHT: f32 = 2.5;
const SUBSTANCE_WEIGHT: f32 = 1.0;
const OVERREACH_PENALTY: f32 = 1.0;

/// Minimum word count before a commitment counts as more than a fragment.
const SUBSTANCE_WORDS: usize = 4;

#[derive(Debug, Clone, Copy)]
struct CriteriaHits {
    specific: bool,
    measurable: bool,
    time_bound: bool,
    substantial: bool,
    overreach: bool,
}

impl CriteriaHits {
    fn detect(text: &str) -> Self {
        Self {
            specific: ACTION_VERB.is_match(text) || INTENT_PREFIX.is_match(text),
            measurable: QUANTITY.is_match(text),
            time_bound: TIME_BOUND.is_match(text),
            substantial: text.split_whitespace().count() >= SUBSTANCE_WORDS,
            overreach: LARGE_NUMBER.is_match(text),
        }
    }

    fn score(&self) -> f32 {
        let mut score = BASE_SCORE;
        if self.specific {
            score += SPECIFIC_WEIGHT;
        }
        if self.measurable {
            score += MEASURABLE_WEIGHT;
        }
        if self.time_bound {
            score += TIME_BOUND_WEIGHT;
        }
        if self.substantial {
            score += SUBSTANCE_WEIGHT;
        }
        if self.overreach {
            score -= OVERREACH_PENALTY;
        }
        score.clamp(0.0, 10.0)
    }
}

/// Deterministic SMART scorer built from the pattern tables above.
#[derive(Debug, Default, Clone)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn build_suggestion(text: &str, hits: &CriteriaHits) -> String {
        let core = INTENT_PREFIX.replace(text.trim(), "");
        let mut suggestion = format!("I will {}", core.trim_end_matches('.'));
        if !hits.measurable {
            suggestion.push_str(" for 15 minutes");
        }
        if !hits.time_bound {
            suggestion.push_str(" by 8pm today");
        }
        suggestion
    }

    fn build_feedback(hits: &CriteriaHits) -> String {
        let mut notes = Vec::new();
        if !hits.specific {
            notes.push("Start with a concrete action (\"I will read...\", \"I will call...\").");
        }
        if !hits.measurable {
            notes.push("Add a quantity so you can tell when it's done (pages, minutes, reps).");
        }
        if !hits.time_bound {
            notes.push("Give it a deadline (\"by 8pm\", \"before Friday\").");
        }
        if !hits.substantial {
            notes.push("Say a bit more about what exactly you'll do.");
        }
        if hits.overreach {
            notes.push("That number looks ambitious for one commitment; consider scaling down.");
        }
        if notes.is_empty() {
            "Clear, measurable and time-bound. Nice work.".to_string()
        } else {
            notes.join("\n")
        }
    }
}

#[async_trait]
impl CommitmentAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, text: &str) -> Result<SmartAnalysis, AnalyzerFailure> {
        let hits = CriteriaHits::detect(text);
        Ok(SmartAnalysis {
            score: hits.score(),
            suggestion: Self::build_suggestion(text, &hits),
            feedback: Self::build_feedback(&hits),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn score_of(text: &str) -> f32 {
        HeuristicAnalyzer::new().analyze(text).await.unwrap().score
    }

    #[tokio::test]
    async fn test_vague_commitment_scores_low() {
        assert!(score_of("read a book").await < 8.0);
        assert!(score_of("exercise more").await < 8.0);
    }

    #[tokio::test]
    async fn test_full_smart_commitment_scores_high() {
        assert!(score_of("I will read 10 pages by 8pm today").await >= 8.0);
        assert!(score_of("I will exercise for 20 minutes before work tomorrow").await >= 8.0);
    }

    #[tokio::test]
    async fn test_suggestion_fills_missing_criteria() {
        let analyzer = HeuristicAnalyzer::new();
        let analysis = analyzer.analyze("read a book").await.unwrap();
        assert!(analysis.suggestion.starts_with("I will"));
        assert!(analysis.suggestion.contains("15 minutes"));
        assert!(analysis.suggestion.contains("by 8pm today"));

        // The suggested rewrite should itself pass the threshold.
        let rescored = analyzer.analyze(&analysis.suggestion).await.unwrap();
        assert!(rescored.score >= 8.0, "suggestion scored {}", rescored.score);
    }

    #[tokio::test]
    async fn test_suggestion_does_not_duplicate_intent_prefix() {
        let analyzer = HeuristicAnalyzer::new();
        let analysis = analyzer.analyze("I will call my mentor").await.unwrap();
        assert!(!analysis.suggestion.to_lowercase().contains("i will i will"));
    }

    #[tokio::test]
    async fn test_overreach_penalized() {
        let modest = score_of("I will write 20 pages by Friday").await;
        let absurd = score_of("I will write 5000 pages by Friday").await;
        assert!(absurd < modest);
    }

    #[tokio::test]
    async fn test_feedback_names_missing_criteria() {
        let analysis = HeuristicAnalyzer::new().analyze("read a book").await.unwrap();
        assert!(analysis.feedback.contains("quantity"));
        assert!(analysis.feedback.contains("deadline"));
    }

    #[tokio::test]
    async fn test_scores_stay_on_scale() {
        for text in ["", "x", "I will read 10 pages by 8pm today and more"] {
            let score = score_of(text).await;
            assert!((0.0..=10.0).contains(&score));
        }
    }
}
