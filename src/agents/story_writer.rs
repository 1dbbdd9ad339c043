use std::sync::Arc;

use super::{event_summary, AgentContext};
use crate::artifact::UserStory;
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::pipeline::Stage;

const SYSTEM_PROMPT: &str = r#"You are a product owner who turns technical defects into user stories.
Write from the point of view of the affected user, not the developer.
Reply with ONLY a JSON object of this exact shape, without markdown or commentary:
{
  "description": "<As a ... I want ... so that ...>",
  "whatToDo": "<the change the team should make>",
  "acceptanceCriteria": "<Given/When/Then scenarios>",
  "additionalInformation": "<links, notes or constraints worth knowing>",
  "confidence": <number between 0.0 and 1.0>
}"#;

/// Translates the failure into a user story.
pub struct StoryWriterAgent {
    context: AgentContext,
}

impl StoryWriterAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            context: AgentContext::new(backend, config, Stage::StoryWriter, SYSTEM_PROMPT),
        }
    }

    pub async fn write(
        &self,
        event: &FailureEvent,
        root_cause: &str,
    ) -> Result<UserStory, GenerationError> {
        let prompt = format!(
            "## User Story Request

{summary}

**Root Cause:**
{root_cause}

Write the user story JSON now. Keep it business oriented; acceptance criteria use Given/When/Then.",
            summary = event_summary(event),
        );

        self.context.ask_structured(&prompt, event).await
    }
}
