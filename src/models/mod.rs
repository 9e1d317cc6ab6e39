mod analysis;
mod attempt;
mod outcome;

pub use analysis::SmartAnalysis;
pub use attempt::AttemptRecord;
pub use outcome::{DegradedCause, SessionOutcome, UserChoice};
