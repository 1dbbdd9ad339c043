use std::sync::Arc;

use super::{event_summary, AgentContext};
use crate::artifact::SeverityAssessment;
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::pipeline::Stage;

const SYSTEM_PROMPT: &str = r#"You are an engineering manager who triages software defects.
Rate the failure on this scale:
  Blocker  = production outage or release blocker
  Critical = core functionality broken, no workaround
  Major    = feature partially broken or a workaround exists
  Minor    = cosmetic or low impact
Reply with ONLY a JSON object of this exact shape, without markdown or commentary:
{
  "level": "<Blocker|Critical|Major|Minor>",
  "rationale": "<two or three sentences>",
  "confidence": <number between 0.0 and 1.0>
}"#;

/// Rates how severe the failure is.
pub struct SeverityAgent {
    context: AgentContext,
}

impl SeverityAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            context: AgentContext::new(backend, config, Stage::Severity, SYSTEM_PROMPT),
        }
    }

    pub async fn assess(
        &self,
        event: &FailureEvent,
        technical_analysis: &str,
        root_cause: &str,
    ) -> Result<SeverityAssessment, GenerationError> {
        let prompt = format!(
            "## Severity Assessment Request

{summary}

**Technical Analysis:**
{technical_analysis}

**Root Cause:**
{root_cause}

Assess the severity and return the JSON now.",
            summary = event_summary(event),
        );

        self.context.ask_structured(&prompt, event).await
    }
}
