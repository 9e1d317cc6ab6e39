//! User-facing messages for the retry dialogue.
//!
//! The tiered retry prompts and the final-choice prompt are minijinja
//! templates bundled with `include_str!`; short confirmations are built
//! inline. Tier selection is keyed by the attempt count at prompt time:
//! the nudge gets firmer as retries accumulate.

use minijinja::{Environment, context};
use once_cell::sync::Lazy;

use crate::error::Result;
use crate::models::{SmartAnalysis, UserChoice};
use crate::persistence::{SaveSource, SavedCommitment};

/// Choices offered between analysis rounds while retries remain.
pub const RETRY_CHOICES: &[UserChoice] = &[
    UserChoice::RetryManual,
    UserChoice::UseAiSuggestion,
    UserChoice::KeepOriginal,
    UserChoice::Cancel,
];

/// Choices offered once the retry budget is exhausted.
pub const FINAL_CHOICES: &[UserChoice] = &[
    UserChoice::SaveFinal,
    UserChoice::UseAiSuggestion,
    UserChoice::Cancel,
];

/// Choices available after a failed save parked the session.
pub const PENDING_SAVE_CHOICES: &[UserChoice] = &[UserChoice::SaveFinal, UserChoice::Cancel];

pub const REWRITE_PROMPT: &str =
    "Got it. Type the new wording of your commitment and send it.";

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("gentle", include_str!("../../templates/guidance_gentle.j2"))
        .expect("bundled gentle template");
    env.add_template("criteria", include_str!("../../templates/guidance_criteria.j2"))
        .expect("bundled criteria template");
    env.add_template("example", include_str!("../../templates/guidance_example.j2"))
        .expect("bundled example template");
    env.add_template("final", include_str!("../../templates/final_choice.j2"))
        .expect("bundled final template");
    env
});

/// Render the guidance tier for a below-threshold analysis.
pub fn retry_prompt(attempt_count: u32, analysis: &SmartAnalysis) -> Result<String> {
    let name = match attempt_count {
        0 => "gentle",
        1 => "criteria",
        _ => "example",
    };
    let rendered = TEMPLATES.get_template(name)?.render(context! {
        score => format!("{:.1}", analysis.score),
        suggestion => analysis.suggestion.clone(),
        feedback => analysis.feedback.clone(),
    })?;
    Ok(rendered)
}

/// Render the last-round prompt offered when all retries are spent.
pub fn final_prompt(score: f32, text: &str) -> Result<String> {
    let rendered = TEMPLATES.get_template("final")?.render(context! {
        score => format!("{:.1}", score),
        text => text,
    })?;
    Ok(rendered)
}

/// Confirmation sent after a successful save.
pub fn saved_message(record: &SavedCommitment) -> String {
    match record.source {
        SaveSource::Accepted => format!(
            "Locked in at {:.1}/10:\n\n  \"{}\"\n\nGreat commitment. Go do it.",
            record.score, record.text
        ),
        SaveSource::DegradedTimeout | SaveSource::DegradedError => format!(
            "Saved:\n\n  \"{}\"\n\nScoring is unavailable right now, so I recorded it with a default score of {:.1}/10. Your commitment still counts.",
            record.text, record.score
        ),
        SaveSource::KeptOriginal => {
            format!("Kept your original wording:\n\n  \"{}\"", record.text)
        }
        SaveSource::FinalSave => {
            format!("Saved at {:.1}/10:\n\n  \"{}\"", record.score, record.text)
        }
    }
}

pub fn cancelled_message() -> &'static str {
    "No problem, nothing was saved. Send a new commitment whenever you're ready."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> SmartAnalysis {
        SmartAnalysis::new(4.0, "I will read 10 pages by 8pm", "Add a deadline")
    }

    #[test]
    fn test_tiers_escalate_with_attempt_count() {
        let gentle = retry_prompt(0, &analysis()).unwrap();
        let criteria = retry_prompt(1, &analysis()).unwrap();
        let example = retry_prompt(2, &analysis()).unwrap();

        assert!(gentle.contains("solid start"));
        assert!(criteria.contains("SMART"));
        assert!(example.contains("Before:"));
        for prompt in [&gentle, &criteria, &example] {
            assert!(prompt.contains("I will read 10 pages by 8pm"));
            assert!(prompt.contains("4.0/10"));
        }
    }

    #[test]
    fn test_high_tier_reused_past_two() {
        // attempt_count 3+ should not panic, it reuses the strongest tier
        let prompt = retry_prompt(5, &analysis()).unwrap();
        assert!(prompt.contains("Before:"));
    }

    #[test]
    fn test_final_prompt_shows_current_text() {
        let prompt = final_prompt(3.0, "exercise more").unwrap();
        assert!(prompt.contains("exercise more"));
        assert!(prompt.contains("3.0/10"));
    }

    #[test]
    fn test_degraded_message_mentions_default_score() {
        let record = SavedCommitment::new("u1", "read a book", 6.0, SaveSource::DegradedTimeout);
        let message = saved_message(&record);
        assert!(message.contains("default score"));
        assert!(message.contains("6.0/10"));
    }
}
