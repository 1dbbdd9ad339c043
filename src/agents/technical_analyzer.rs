use std::sync::Arc;

use super::AgentContext;
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::GenerationError;
use crate::event::FailureEvent;
use crate::pipeline::Stage;
use crate::text::{or_not_provided, truncate};

const SYSTEM_PROMPT: &str = "\
You are a senior software engineer who diagnoses failing tests and runtime errors.
Read the failure below and write a factual technical summary.
Stick to what the evidence shows. Answer in plain text with short, clearly labelled sections.";

/// Summarizes what failed, where, and what kind of error it is.
pub struct TechnicalAnalyzerAgent {
    context: AgentContext,
    max_stacktrace_chars: usize,
}

impl TechnicalAnalyzerAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self {
            context: AgentContext::new(backend, config, Stage::TechnicalAnalysis, SYSTEM_PROMPT),
            max_stacktrace_chars: config.max_stacktrace_chars,
        }
    }

    pub async fn analyze(&self, event: &FailureEvent) -> Result<String, GenerationError> {
        self.context.ask(&self.user_prompt(event)).await
    }

    fn user_prompt(&self, event: &FailureEvent) -> String {
        let stack_trace = event
            .stack_trace
            .as_deref()
            .map(|trace| truncate(trace, self.max_stacktrace_chars));

        format!(
            "## Technical Analysis Request

**Source:** {source}
**Test:** {test}
**Error:** {error}

**Stack Trace:**
```
{stack_trace}
```

**Additional Context:** {context}

Cover the following:
1. Error type and classification
2. Component or layer where the failure originated
3. Notable frames or messages in the stack trace
4. Whether this looks like a unit-level or an integration-level problem",
            source = event.source,
            test = or_not_provided(event.test_name.as_deref()),
            error = event.error_message,
            stack_trace = or_not_provided(stack_trace.as_deref()),
            context = or_not_provided(event.context.as_deref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::event::FailureSource;

    fn agent(max_stacktrace_chars: usize) -> (Arc<ScriptedBackend>, TechnicalAnalyzerAgent) {
        let backend = Arc::new(ScriptedBackend::new().reply("TechnicalAnalyzer", "NPE in pay()"));
        let config = AgentsConfig {
            max_stacktrace_chars,
            ..AgentsConfig::default()
        };
        (backend.clone(), TechnicalAnalyzerAgent::new(backend, &config))
    }

    #[tokio::test]
    async fn returns_backend_text_verbatim() {
        let (backend, agent) = agent(3000);
        let event = FailureEvent::new(FailureSource::Junit, "Expected 200 but was 500")
            .with_test_name("PaymentServiceTest#pay")
            .with_stack_trace("java.lang.AssertionError\n  at PaymentServiceTest.pay(PaymentServiceTest.java:42)");

        let text = agent.analyze(&event).await.unwrap();

        assert_eq!(text, "NPE in pay()");
        let call = backend.call("TechnicalAnalyzer").unwrap();
        assert_eq!(call.system_prompt, SYSTEM_PROMPT);
        assert!(call.user_prompt.contains("**Test:** PaymentServiceTest#pay"));
        assert!(call.user_prompt.contains("PaymentServiceTest.java:42"));
        assert!(call.user_prompt.contains("**Additional Context:** (not provided)"));
    }

    #[test]
    fn truncates_long_stack_traces() {
        let (_, agent) = agent(10);
        let event = FailureEvent::new(FailureSource::Log, "boom").with_stack_trace("x".repeat(50));

        let prompt = agent.user_prompt(&event);

        assert!(prompt.contains(&format!("{}\n... [truncated]", "x".repeat(10))));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[test]
    fn missing_stack_trace_uses_placeholder() {
        let (_, agent) = agent(3000);
        let event = FailureEvent::new(FailureSource::Log, "boom");

        let prompt = agent.user_prompt(&event);

        assert!(prompt.contains("```\n(not provided)\n```"));
    }
}
