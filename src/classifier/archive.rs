use super::OutcomeClassifier;
use crate::core::models::{AttemptError, AttemptResult, Verdict};

/// Exact classifier for archive keys: the integrity check either passed or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveClassifier;

impl OutcomeClassifier for ArchiveClassifier {
    fn classify(&self, result: &AttemptResult) -> Verdict {
        match &result.error {
            None => Verdict::success("integrity_check"),
            Some(AttemptError::Rejected(_)) | Some(AttemptError::Structural(_)) => {
                Verdict::failure()
            }
            Some(AttemptError::Transport(_)) | Some(AttemptError::Timeout(_)) => {
                Verdict::inconclusive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Classification;
    use std::time::Duration;

    #[test]
    fn test_archive_verdicts() {
        let ok = AttemptResult::default();
        assert!(ArchiveClassifier.classify(&ok).is_success());

        let rejected = AttemptResult::failed(AttemptError::Rejected("bad crc".into()), Duration::ZERO);
        assert_eq!(ArchiveClassifier.classify(&rejected).classification, Classification::Failure);

        let io = AttemptResult::failed(AttemptError::Transport("join".into()), Duration::ZERO);
        assert_eq!(ArchiveClassifier.classify(&io).classification, Classification::Inconclusive);
    }
}
