//! In-memory backend for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::GenerationBackend;
use crate::error::GenerationError;

#[derive(Debug, Clone)]
pub(crate) struct CallRecord {
    pub role: String,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

#[derive(Default)]
struct Script {
    reply: Option<String>,
    failure: Option<String>,
    delay: Duration,
}

/// Returns canned text per role, with optional delays and failures.
///
/// Unscripted roles answer `"<role> output"`. Every call is recorded; a
/// call whose task was aborted keeps `finished_at == None`.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, role: &str, text: &str) -> Self {
        self.scripts.entry(role.to_string()).or_default().reply = Some(text.to_string());
        self
    }

    pub fn delay(mut self, role: &str, delay: Duration) -> Self {
        self.scripts.entry(role.to_string()).or_default().delay = delay;
        self
    }

    pub fn fail(mut self, role: &str, message: &str) -> Self {
        self.scripts.entry(role.to_string()).or_default().failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, role: &str) -> Option<CallRecord> {
        self.calls().into_iter().find(|c| c.role == role)
    }

    pub fn was_called(&self, role: &str) -> bool {
        self.call(role).is_some()
    }

    pub fn finished(&self, role: &str) -> bool {
        self.call(role).is_some_and(|c| c.finished_at.is_some())
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        role: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(CallRecord {
                role: role.to_string(),
                model: model.to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                started_at: Instant::now(),
                finished_at: None,
            });
            calls.len() - 1
        };

        let script = self.scripts.get(role);
        let delay = script.map_or(Duration::ZERO, |s| s.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap()[index].finished_at = Some(Instant::now());

        if let Some(message) = script.and_then(|s| s.failure.as_ref()) {
            return Err(GenerationError::NonZeroExit {
                role: role.to_string(),
                code: 1,
                stderr: message.clone(),
            });
        }

        Ok(script
            .and_then(|s| s.reply.clone())
            .unwrap_or_else(|| format!("{role} output")))
    }
}
