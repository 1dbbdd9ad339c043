use std::sync::Arc;

use super::{event_summary, AgentContext};
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::pipeline::Stage;

const SYSTEM_PROMPT: &str = "\
You are a root-cause analysis expert for JVM services and their test suites
(JUnit, MockMvc, Concordion). Name the single most probable cause of the failure
and propose how to fix it. Be specific and back every claim with the evidence given.";

/// Deduces the most probable root cause from the technical analysis.
pub struct RootCauseAgent {
    context: AgentContext,
}

impl RootCauseAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            context: AgentContext::new(backend, config, Stage::RootCause, SYSTEM_PROMPT),
        }
    }

    pub async fn analyze(
        &self,
        event: &FailureEvent,
        technical_analysis: &str,
    ) -> Result<String, GenerationError> {
        let prompt = format!(
            "## Root Cause Analysis Request

{summary}

**Technical Analysis:**
{technical_analysis}

Provide:
1. The most probable root cause, in one or two specific sentences
2. Contributing factors, if any
3. Two or three concrete fix directions
4. What extra information would confirm this root cause",
            summary = event_summary(event),
        );

        self.context.ask(&prompt).await
    }
}
