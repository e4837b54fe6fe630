pub mod archive;
pub mod rules;
pub mod web;

use crate::core::models::{AttemptResult, Verdict};

pub use archive::ArchiveClassifier;
pub use web::WebClassifier;

/// Turns the raw signals of one attempt into a verdict
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, result: &AttemptResult) -> Verdict;
}
