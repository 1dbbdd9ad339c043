use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Runner or channel a failure was reported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureSource {
    #[serde(alias = "junit", alias = "JUnit")]
    Junit,
    #[serde(alias = "mockMvc", alias = "mock_mvc", alias = "MockMvc")]
    MockMvc,
    #[serde(alias = "concordion", alias = "Concordion")]
    Concordion,
    #[serde(alias = "log", alias = "Log")]
    Log,
}

impl fmt::Display for FailureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Junit => "JUNIT",
            Self::MockMvc => "MOCK_MVC",
            Self::Concordion => "CONCORDION",
            Self::Log => "LOG",
        };
        f.write_str(name)
    }
}

/// A test failure or log excerpt that triggers one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEvent {
    pub source: FailureSource,
    #[serde(default)]
    pub test_name: Option<String>,
    pub error_message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl FailureEvent {
    pub fn new(source: FailureSource, error_message: impl Into<String>) -> Self {
        Self {
            source,
            test_name: None,
            error_message: error_message.into(),
            stack_trace: None,
            context: None,
        }
    }

    #[must_use]
    pub fn with_test_name(mut self, test_name: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self
    }

    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Rejects events the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error if `error_message` is empty or whitespace only.
    pub fn validate(&self) -> Result<()> {
        if self.error_message.trim().is_empty() {
            bail!("errorMessage must not be blank");
        }
        Ok(())
    }
}
