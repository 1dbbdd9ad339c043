//! Turns free-form generated text into typed records.
//!
//! Parsing never fails from the caller's point of view: text that does not
//! match the record's schema is wrapped into a deterministic fallback record
//! that carries the raw answer verbatim.

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::event::FailureEvent;
use crate::text::{preview, strip_code_fence};

const PREVIEW_CHARS: usize = 200;

/// A record the model is asked to answer with as JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// Builds the degraded record used when `raw` cannot be parsed.
    ///
    /// Implementations must place `raw` unchanged into one of the free-text fields.
    fn fallback(raw: &str, event: &FailureEvent) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Parsed,
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub value: T,
    pub outcome: NormalizeOutcome,
}

impl<T> Normalized<T> {
    #[cfg(test)]
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, NormalizeOutcome::Fallback { .. })
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Parses `raw` into `T`, falling back to [`StructuredOutput::fallback`].
pub fn normalize<T: StructuredOutput>(role: &str, raw: &str, event: &FailureEvent) -> Normalized<T> {
    normalize_with(role, raw, |raw| T::fallback(raw, event))
}

/// Parses `raw` into `T`, building the result with `fallback` on failure.
///
/// A single surrounding code fence is removed before parsing. Parse errors
/// are logged and absorbed.
pub fn normalize_with<T, F>(role: &str, raw: &str, fallback: F) -> Normalized<T>
where
    T: DeserializeOwned,
    F: FnOnce(&str) -> T,
{
    let body = strip_code_fence(raw);

    match serde_json::from_str::<T>(body) {
        Ok(value) => {
            debug!("[{role}] structured response parsed");
            Normalized {
                value,
                outcome: NormalizeOutcome::Parsed,
            }
        }
        Err(e) => {
            warn!(
                "[{role}] response is not valid JSON, using raw text in fallback record: {e} (raw: {})",
                preview(raw, PREVIEW_CHARS)
            );
            Normalized {
                value: fallback(raw),
                outcome: NormalizeOutcome::Fallback {
                    reason: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{BugReport, SeverityAssessment, SeverityLevel, UserStory};
    use crate::event::FailureSource;

    fn event() -> FailureEvent {
        FailureEvent::new(FailureSource::Junit, "Expected 200 but was 500")
    }

    #[test]
    fn parses_fenced_severity() {
        let raw = "```json\n{\"level\":\"Major\",\"rationale\":\"x\"}\n```";

        let normalized: Normalized<SeverityAssessment> = normalize("Severity", raw, &event());

        assert_eq!(normalized.outcome, NormalizeOutcome::Parsed);
        assert_eq!(normalized.value.level, SeverityLevel::Major);
        assert_eq!(normalized.value.rationale, "x");
    }

    #[test]
    fn fenced_and_unfenced_parse_identically() {
        let core = r#"{"level":"Critical","rationale":"checkout down","confidence":0.8}"#;
        let fenced = format!("```json\n{core}\n```");

        let plain: Normalized<SeverityAssessment> = normalize("Severity", core, &event());
        let stripped: Normalized<SeverityAssessment> = normalize("Severity", &fenced, &event());

        assert!(!plain.is_fallback());
        assert!(!stripped.is_fallback());
        assert_eq!(plain.value, stripped.value);
    }

    #[test]
    fn prose_falls_back_with_raw_rationale() {
        let raw = "I think this is bad.";

        let normalized: Normalized<SeverityAssessment> = normalize("Severity", raw, &event());

        assert!(normalized.is_fallback());
        assert_eq!(normalized.value.level, SeverityLevel::Major);
        assert_eq!(normalized.value.rationale, raw);
    }

    #[test]
    fn fallback_preserves_raw_text_including_fences() {
        let raw = "```json\n{\"title\": \"unterminated\n```";

        let normalized: Normalized<BugReport> = normalize("BugWriter", raw, &event());

        assert!(normalized.is_fallback());
        assert_eq!(normalized.value.description, raw);
    }

    #[test]
    fn schema_mismatch_falls_back() {
        // Valid JSON, wrong shape
        let raw = r#"{"asA":"customer","iWant":"to pay","soThat":"I get my goods"}"#;

        let normalized: Normalized<UserStory> = normalize("StoryWriter", raw, &event());

        assert!(normalized.is_fallback());
        assert_eq!(normalized.value.additional_information, raw);
    }

    #[test]
    fn unknown_severity_label_falls_back() {
        let raw = r#"{"level":"P2","rationale":"core flow impacted"}"#;

        let normalized: Normalized<SeverityAssessment> = normalize("Severity", raw, &event());

        match &normalized.outcome {
            NormalizeOutcome::Fallback { reason } => assert!(reason.contains("unknown variant")),
            NormalizeOutcome::Parsed => panic!("P2 is not a known severity label"),
        }
        assert_eq!(normalized.value.rationale, raw);
    }

    #[test]
    fn confidence_above_one_falls_back() {
        let raw = r#"{"level":"Major","rationale":"x","confidence":7.5}"#;

        let normalized: Normalized<SeverityAssessment> = normalize("Severity", raw, &event());

        match &normalized.outcome {
            NormalizeOutcome::Fallback { reason } => assert!(reason.contains("0.0..=1.0")),
            NormalizeOutcome::Parsed => panic!("confidence 7.5 must not parse"),
        }
        assert!(normalized.value.confidence.is_none());
        assert_eq!(normalized.value.rationale, raw);
    }

    #[test]
    fn negative_confidence_falls_back() {
        let raw = r#"{"title":"t","description":"d","stepsToReproduce":"s","expectedBehavior":"e","actualBehavior":"a","confidence":-3.0}"#;

        let normalized: Normalized<BugReport> = normalize("BugWriter", raw, &event());

        assert!(normalized.is_fallback());
        assert!(normalized.value.confidence.is_none());
        assert_eq!(normalized.value.description, raw);
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        for raw in [
            r#"{"level":"Minor","rationale":"x","confidence":0.0}"#,
            r#"{"level":"Minor","rationale":"x","confidence":1.0}"#,
            r#"{"level":"Minor","rationale":"x","confidence":null}"#,
        ] {
            let normalized: Normalized<SeverityAssessment> = normalize("Severity", raw, &event());
            assert!(!normalized.is_fallback(), "{raw} should parse");
        }
    }

    #[test]
    fn empty_response_falls_back() {
        let normalized: Normalized<SeverityAssessment> = normalize("Severity", "", &event());
        assert!(normalized.is_fallback());
        assert_eq!(normalized.value.rationale, "");
    }

    #[test]
    fn normalize_with_uses_custom_builder() {
        let normalized: Normalized<Vec<u32>> =
            normalize_with("Custom", "not a list", |raw| vec![raw.len() as u32]);

        assert_eq!(normalized.into_value(), vec![10]);
    }
}
