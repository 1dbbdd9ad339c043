//! The five agent steps of the pipeline.
//!
//! Each step builds its prompt from the failure event plus the upstream text
//! it depends on, calls the generation backend and, for the structured
//! steps, normalizes the answer into a typed record.

mod bug_writer;
mod root_cause;
mod severity;
mod story_writer;
mod technical_analyzer;

use std::sync::Arc;

use log::{debug, info, warn};

use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::normalize::{normalize, NormalizeOutcome, StructuredOutput};
use crate::pipeline::Stage;
use crate::text::or_not_provided;
use crate::timing::timed;

pub use bug_writer::BugWriterAgent;
pub use root_cause::RootCauseAgent;
pub use severity::SeverityAgent;
pub use story_writer::StoryWriterAgent;
pub use technical_analyzer::TechnicalAnalyzerAgent;

/// Backend handle plus the resolved model and system prompt for one stage.
#[derive(Clone)]
pub(crate) struct AgentContext {
    backend: Arc<dyn GenerationBackend>,
    stage: Stage,
    model: String,
    system_prompt: String,
}

impl AgentContext {
    fn new(
        backend: Arc<dyn GenerationBackend>,
        config: &AgentsConfig,
        stage: Stage,
        default_system_prompt: &str,
    ) -> Self {
        Self {
            backend,
            stage,
            model: config.model_for(stage).to_string(),
            system_prompt: config
                .system_prompt_for(stage)
                .unwrap_or(default_system_prompt)
                .to_string(),
        }
    }

    fn role(&self) -> &'static str {
        self.stage.role()
    }

    async fn ask(&self, user_prompt: &str) -> Result<String, GenerationError> {
        let role = self.role();
        debug!("{role} starting (model={})", self.model);

        let result = timed(self.backend.generate(
            role,
            &self.model,
            &self.system_prompt,
            user_prompt,
        ))
        .await;

        match &result.value {
            Ok(text) => debug!(
                "{role} completed in {}ms ({} chars)",
                result.elapsed_ms(),
                text.len()
            ),
            Err(e) => warn!("{role} failed after {}ms: {e}", result.elapsed_ms()),
        }

        result.value
    }

    /// Asks for a structured record and normalizes the answer.
    async fn ask_structured<T: StructuredOutput>(
        &self,
        user_prompt: &str,
        event: &FailureEvent,
    ) -> Result<T, GenerationError> {
        let raw = self.ask(user_prompt).await?;
        let normalized = normalize::<T>(self.role(), &raw, event);

        match &normalized.outcome {
            NormalizeOutcome::Parsed => debug!("{} answer parsed", self.role()),
            NormalizeOutcome::Fallback { reason } => info!(
                "{} answer kept as fallback record ({reason})",
                self.role()
            ),
        }

        Ok(normalized.into_value())
    }
}

/// Common header listing the failure event's fields.
fn event_summary(event: &FailureEvent) -> String {
    format!(
        "**Error:** {}\n**Source:** {}\n**Test:** {}\n**Context:** {}",
        event.error_message,
        event.source,
        or_not_provided(event.test_name.as_deref()),
        or_not_provided(event.context.as_deref()),
    )
}

/// All five agents, configured once and shared by every pipeline run.
pub struct Agents {
    pub technical_analyzer: TechnicalAnalyzerAgent,
    pub root_cause: RootCauseAgent,
    pub bug_writer: BugWriterAgent,
    pub story_writer: StoryWriterAgent,
    pub severity: SeverityAgent,
}

impl Agents {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            technical_analyzer: TechnicalAnalyzerAgent::new(backend.clone(), config),
            root_cause: RootCauseAgent::new(backend.clone(), config),
            bug_writer: BugWriterAgent::new(backend.clone(), config),
            story_writer: StoryWriterAgent::new(backend.clone(), config),
            severity: SeverityAgent::new(backend, config),
        }
    }
}
