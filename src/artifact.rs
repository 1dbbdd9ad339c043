use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::event::FailureEvent;
use crate::normalize::StructuredOutput;
use crate::pipeline::Stage;
use crate::text::{or_not_provided, NOT_PROVIDED};

const NOT_PARSED: &str = "(not parsed)";

/// Rejects confidences outside `0.0..=1.0`, so the record fails the strict
/// parse and the normalizer falls back.
fn confidence_in_range<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(confidence) if !(0.0..=1.0).contains(&confidence) => Err(de::Error::custom(
            format!("confidence {confidence} is outside 0.0..=1.0"),
        )),
        confidence => Ok(confidence),
    }
}

/// Output of one agent step together with the time the step took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult<T> {
    pub payload: T,
    pub duration_ms: u64,
}

impl<T> AgentResult<T> {
    pub fn new(payload: T, duration_ms: u64) -> Self {
        Self {
            payload,
            duration_ms,
        }
    }
}

/// Structured bug report written by the bug writer agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugReport {
    pub title: String,
    pub description: String,
    pub steps_to_reproduce: String,
    pub expected_behavior: String,
    pub actual_behavior: String,
    #[serde(
        default,
        deserialize_with = "confidence_in_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl BugReport {
    #[must_use]
    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }
}

impl StructuredOutput for BugReport {
    fn fallback(raw: &str, event: &FailureEvent) -> Self {
        Self {
            title: format!("Bug: {}", event.error_message),
            description: raw.to_string(),
            steps_to_reproduce: or_not_provided(event.test_name.as_deref()).to_string(),
            expected_behavior: NOT_PARSED.to_string(),
            actual_behavior: event.error_message.clone(),
            confidence: None,
            duration_ms: 0,
        }
    }
}

/// User story derived from the failure by the story writer agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    pub description: String,
    pub what_to_do: String,
    pub acceptance_criteria: String,
    pub additional_information: String,
    #[serde(
        default,
        deserialize_with = "confidence_in_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl UserStory {
    #[must_use]
    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }
}

impl StructuredOutput for UserStory {
    fn fallback(raw: &str, event: &FailureEvent) -> Self {
        Self {
            description: format!(
                "As a developer, I want the failure \"{}\" fixed so that the application behaves correctly",
                event.error_message
            ),
            what_to_do: format!("fix: {}", event.error_message),
            acceptance_criteria: NOT_PARSED.to_string(),
            additional_information: raw.to_string(),
            confidence: None,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityLevel {
    #[serde(alias = "blocker", alias = "BLOCKER")]
    Blocker,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
    #[serde(alias = "major", alias = "MAJOR")]
    Major,
    #[serde(alias = "minor", alias = "MINOR")]
    Minor,
}

impl SeverityLevel {
    /// Level assigned when the severity agent's answer cannot be parsed.
    pub const FALLBACK: Self = Self::Major;
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Blocker => "Blocker",
            Self::Critical => "Critical",
            Self::Major => "Major",
            Self::Minor => "Minor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityAssessment {
    pub level: SeverityLevel,
    pub rationale: String,
    #[serde(
        default,
        deserialize_with = "confidence_in_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl SeverityAssessment {
    #[must_use]
    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }
}

impl StructuredOutput for SeverityAssessment {
    fn fallback(raw: &str, _event: &FailureEvent) -> Self {
        Self {
            level: SeverityLevel::FALLBACK,
            rationale: raw.to_string(),
            confidence: None,
            duration_ms: 0,
        }
    }
}

/// Aggregated result of one full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub technical_analysis: AgentResult<String>,
    pub root_cause: AgentResult<String>,
    pub bug_report: BugReport,
    pub user_story: UserStory,
    pub severity: SeverityAssessment,
    pub total_ms: u64,
    pub generated_at: DateTime<Utc>,
}

impl Artifact {
    /// Per-stage durations in graph order.
    pub fn stage_durations(&self) -> IndexMap<Stage, u64> {
        IndexMap::from([
            (Stage::TechnicalAnalysis, self.technical_analysis.duration_ms),
            (Stage::RootCause, self.root_cause.duration_ms),
            (Stage::BugWriter, self.bug_report.duration_ms),
            (Stage::StoryWriter, self.user_story.duration_ms),
            (Stage::Severity, self.severity.duration_ms),
        ])
    }

    pub fn max_stage_ms(&self) -> u64 {
        self.stage_durations().values().copied().max().unwrap_or(0)
    }
}

/// Shown for absent optional values in human-readable output.
pub fn display_optional(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_PROVIDED.to_string(), |v| format!("{v:.2}"))
}
