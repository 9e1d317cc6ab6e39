use serde::{Deserialize, Serialize};

use crate::analyzer::AnalyzerFailure;

/// Result of one SMART analysis pass over a commitment text.
///
/// A fixed-shape record rather than a loose map: a malformed response from
/// an analyzer fails fast at this seam instead of propagating missing-key
/// surprises into the retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAnalysis {
    /// SMART score from 0.0 to 10.0.
    pub score: f32,
    /// Rewritten version of the commitment proposed by the analyzer.
    pub suggestion: String,
    /// Criterion-by-criterion feedback for the user.
    pub feedback: String,
}

impl SmartAnalysis {
    pub fn new(score: f32, suggestion: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            score,
            suggestion: suggestion.into(),
            feedback: feedback.into(),
        }
    }

    /// Reject scores outside the 0-10 scale (or NaN/infinite ones).
    pub fn validated(self) -> Result<Self, AnalyzerFailure> {
        if !self.score.is_finite() || !(0.0..=10.0).contains(&self.score) {
            return Err(AnalyzerFailure::Malformed(format!(
                "score {} outside 0-10 scale",
                self.score
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_accepts_in_range_scores() {
        assert!(SmartAnalysis::new(0.0, "s", "f").validated().is_ok());
        assert!(SmartAnalysis::new(8.0, "s", "f").validated().is_ok());
        assert!(SmartAnalysis::new(10.0, "s", "f").validated().is_ok());
    }

    #[test]
    fn test_validated_rejects_out_of_range_scores() {
        assert!(SmartAnalysis::new(-0.1, "s", "f").validated().is_err());
        assert!(SmartAnalysis::new(10.5, "s", "f").validated().is_err());
        assert!(SmartAnalysis::new(f32::NAN, "s", "f").validated().is_err());
        assert!(SmartAnalysis::new(f32::INFINITY, "s", "f").validated().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let analysis = SmartAnalysis::new(7.5, "I will read 10 pages by 8pm", "Add a deadline");
        let json = serde_json::to_string(&analysis).unwrap();
        let parsed: SmartAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, analysis);
    }
}
