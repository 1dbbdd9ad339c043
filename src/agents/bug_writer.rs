use std::sync::Arc;

use super::{event_summary, AgentContext};
use crate::artifact::BugReport;
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::pipeline::Stage;

const SYSTEM_PROMPT: &str = r#"You are a QA engineer who writes clear, actionable bug reports.
Reply with ONLY a JSON object of this exact shape, without markdown or commentary:
{
  "title": "<short title, at most 80 characters>",
  "description": "<detailed description of the defect>",
  "stepsToReproduce": "<numbered steps or the failing test name>",
  "expectedBehavior": "<what should happen>",
  "actualBehavior": "<what actually happens>",
  "confidence": <number between 0.0 and 1.0>
}"#;

/// Writes a structured bug report from the technical analysis and root cause.
pub struct BugWriterAgent {
    context: AgentContext,
}

impl BugWriterAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            context: AgentContext::new(backend, config, Stage::BugWriter, SYSTEM_PROMPT),
        }
    }

    pub async fn write(
        &self,
        event: &FailureEvent,
        technical_analysis: &str,
        root_cause: &str,
    ) -> Result<BugReport, GenerationError> {
        let prompt = format!(
            "## Bug Report Request

{summary}

**Technical Analysis:**
{technical_analysis}

**Root Cause:**
{root_cause}

Write the bug report JSON now.",
            summary = event_summary(event),
        );

        self.context.ask_structured(&prompt, event).await
    }
}
