use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use url::Url;

use super::chat::{extract_content, ChatRequest};
use super::GenerationBackend;
use crate::auth::Token;
use crate::error::GenerationError;
use crate::timing::millis;

/// Generation backend that talks to an OpenAI-compatible endpoint directly.
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    token: Option<Token>,
    timeout: Duration,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(endpoint: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("storywriter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid models endpoint: {endpoint}"))?;

        Ok(Self {
            client,
            endpoint,
            token,
            timeout,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn transport_error(&self, role: &str, source: reqwest::Error) -> GenerationError {
        if source.is_timeout() {
            GenerationError::Timeout {
                role: role.to_string(),
                timeout_ms: millis(self.timeout),
            }
        } else {
            GenerationError::Request {
                role: role.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(
        &self,
        role: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        info!("[{role}] POST {} (model={model})", self.endpoint);

        let request = self.auth_request(
            self.client
                .post(self.endpoint.clone())
                .json(&ChatRequest::new(model, system_prompt, user_prompt)),
        );

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(role, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(role, e))?;

        if !status.is_success() {
            error!("[{role}] generation endpoint returned {status}");
            return Err(GenerationError::Status {
                role: role.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        extract_content(role, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETION: &str =
        r#"{"choices":[{"message":{"role":"assistant","content":"NullPointerException in OrderService"}}]}"#;

    #[tokio::test]
    async fn posts_chat_body_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer ghp-test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4.1","messages":[{"role":"system","content":"sys"},{"role":"user","content":"usr"}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(COMPLETION)
            .create_async()
            .await;

        let backend = HttpBackend::new(
            &format!("{}/chat/completions", server.url()),
            Some(Token::from("ghp-test")),
            Duration::from_secs(5),
        )
        .unwrap();

        let text = backend
            .generate("TechnicalAnalyzer", "gpt-4.1", "sys", "usr")
            .await
            .unwrap();

        assert_eq!(text, "NullPointerException in OrderService");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_status_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let backend = HttpBackend::new(
            &format!("{}/chat/completions", server.url()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = backend.generate("RootCause", "m", "s", "u").await.unwrap_err();

        match err {
            GenerationError::Status { role, status, body } => {
                assert_eq!(role, "RootCause");
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_failure() {
        // Port 9 (discard) is not expected to accept HTTP connections locally
        let backend = HttpBackend::new(
            "http://127.0.0.1:9/chat/completions",
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = backend.generate("Severity", "m", "s", "u").await.unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Request { .. } | GenerationError::Timeout { .. }
        ));
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let result = HttpBackend::new("::not a url::", None, Duration::from_secs(1));
        assert!(result.is_err());
    }
}
