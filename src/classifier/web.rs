use super::OutcomeClassifier;
use super::rules::{self, Evidence, Rule};
use crate::core::models::{AttemptResult, Verdict};
use url::Url;

/// Recall-biased classifier for login responses. Rules are OR-combined and
/// evaluated in table order; the first rule that fires names the verdict.
#[derive(Debug, Clone)]
pub struct WebClassifier {
    table: Vec<Rule>,
    submission_url: Url,
    target_url: Url,
    bulk_min_bytes: usize,
}

impl WebClassifier {
    pub fn new(submission_url: Url, target_url: Url) -> Self {
        Self::with_table(
            rules::DEFAULT_TABLE.to_vec(),
            submission_url,
            target_url,
            rules::DEFAULT_BULK_MIN_BYTES,
        )
    }

    pub fn with_table(
        table: Vec<Rule>,
        submission_url: Url,
        target_url: Url,
        bulk_min_bytes: usize,
    ) -> Self {
        Self {
            table,
            submission_url,
            target_url,
            bulk_min_bytes,
        }
    }
}

impl OutcomeClassifier for WebClassifier {
    fn classify(&self, result: &AttemptResult) -> Verdict {
        if result.error.is_some() {
            return Verdict::inconclusive();
        }

        let evidence = Evidence::gather(
            &result.body,
            result.status_code,
            result.final_location.as_ref(),
            &result.new_session_tokens,
            &self.submission_url,
            &self.target_url,
            self.bulk_min_bytes,
        );

        for rule in &self.table {
            if (rule.fires)(&evidence) {
                tracing::debug!("Rule '{}' fired", rule.name);
                return Verdict::success(rule.name);
            }
        }

        Verdict::failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AttemptError, Classification};
    use proptest::prelude::*;
    use std::time::Duration;

    fn classifier() -> WebClassifier {
        WebClassifier::new(
            Url::parse("https://site.test/session").unwrap(),
            Url::parse("https://site.test/login").unwrap(),
        )
    }

    fn response(body: &str, status: u16, location: &str) -> AttemptResult {
        AttemptResult {
            status_code: Some(status),
            response_size: body.len(),
            body: body.to_string(),
            final_location: Some(Url::parse(location).unwrap()),
            elapsed: Duration::from_millis(5),
            new_session_tokens: vec![],
            error: None,
        }
    }

    #[test]
    fn test_plain_failure_page() {
        let verdict = classifier().classify(&response(
            "<p>Incorrect password</p>",
            200,
            "https://site.test/login",
        ));
        assert_eq!(verdict.classification, Classification::Failure);
        assert_eq!(verdict.rule, None);
    }

    #[test]
    fn test_redirect_wins_regardless_of_body() {
        let big_login_page = format!("<form>login</form>{}", "a".repeat(4000));
        let verdict = classifier().classify(&response(
            &big_login_page,
            200,
            "https://site.test/members",
        ));
        assert!(verdict.is_success());
        assert_eq!(verdict.rule, Some("redirect"));
    }

    #[test]
    fn test_transport_error_is_inconclusive() {
        let result = AttemptResult::failed(
            AttemptError::Timeout(Duration::from_secs(10)),
            Duration::from_secs(10),
        );
        let verdict = classifier().classify(&result);
        assert_eq!(verdict.classification, Classification::Inconclusive);
    }

    #[test]
    fn test_custom_table_without_bulk_rule() {
        let c = WebClassifier::with_table(
            vec![rules::REDIRECT, rules::SESSION_TOKEN],
            Url::parse("https://site.test/session").unwrap(),
            Url::parse("https://site.test/login").unwrap(),
            1000,
        );
        let verdict = c.classify(&response(&"z".repeat(5000), 200, "https://site.test/login"));
        assert_eq!(verdict.classification, Classification::Failure);
    }

    #[test]
    fn test_first_matching_rule_names_verdict() {
        let mut result = response("welcome", 200, "https://site.test/login");
        result.new_session_tokens = vec!["sessionid".into()];
        let verdict = classifier().classify(&result);
        assert_eq!(verdict.rule, Some("positive_phrase"));
    }

    proptest! {
        #[test]
        fn prop_failure_phrase_without_other_signals_is_failure(
            phrase_idx in 0usize..rules::FAILURE_PHRASES.len(),
            prefix in "[0-9 ]{0,40}",
            status in prop::sample::select(vec![200u16, 401, 403, 500]),
        ) {
            let body = format!("{}{}", prefix, rules::FAILURE_PHRASES[phrase_idx]);
            let result = response(&body, status, "https://site.test/login");
            let verdict = classifier().classify(&result);
            prop_assert_eq!(verdict.classification, Classification::Failure);
        }
    }
}
