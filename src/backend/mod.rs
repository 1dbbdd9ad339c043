//! Generation Backend adapters.
//!
//! The pipeline only depends on [`GenerationBackend`]; the concrete adapter
//! is picked from [`BackendConfig`] at startup.

mod chat;
mod gh;
mod http;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::auth::Token;
use crate::config::{BackendConfig, Strategy};
use crate::error::GenerationError;

pub use gh::{CliStrategy, GhCliBackend};
pub use http::HttpBackend;

/// Text generation service invoked once per agent step.
///
/// Implementations must enforce their own per-call timeout and must either
/// return the complete response or fail.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generates a response for `user_prompt` under `system_prompt`.
    ///
    /// `role` is a diagnostic label such as `"RootCause"`.
    async fn generate(
        &self,
        role: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> std::result::Result<String, GenerationError>;
}

/// Builds the adapter selected by `config.strategy`.
///
/// # Errors
///
/// Returns an error if the HTTP client or endpoint URL cannot be constructed.
pub fn build_backend(
    config: &BackendConfig,
    token: Option<Token>,
) -> Result<Arc<dyn GenerationBackend>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let backend: Arc<dyn GenerationBackend> = match config.strategy {
        Strategy::GithubModels => Arc::new(GhCliBackend::new(
            &config.binary,
            CliStrategy::GithubModels {
                endpoint: config.models_endpoint.clone(),
            },
            timeout,
        )),
        Strategy::Explain => Arc::new(GhCliBackend::new(
            &config.binary,
            CliStrategy::Explain,
            timeout,
        )),
        Strategy::Http => {
            let token = token.or_else(|| config.token.as_deref().map(Token::from));
            Arc::new(HttpBackend::new(&config.models_endpoint, token, timeout)?)
        }
    };

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_strategy() {
        for strategy in [Strategy::GithubModels, Strategy::Explain, Strategy::Http] {
            let config = BackendConfig {
                strategy,
                ..BackendConfig::default()
            };
            assert!(build_backend(&config, None).is_ok(), "{strategy:?}");
        }
    }

    #[test]
    fn http_strategy_rejects_bad_endpoint() {
        let config = BackendConfig {
            strategy: Strategy::Http,
            models_endpoint: "not a url".to_string(),
            ..BackendConfig::default()
        };
        assert!(build_backend(&config, None).is_err());
    }
}
