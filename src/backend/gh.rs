use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::chat::{extract_content, ChatRequest};
use super::GenerationBackend;
use crate::error::GenerationError;
use crate::timing::millis;

/// How the GitHub CLI is asked for a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliStrategy {
    /// `gh api --method POST <endpoint> --input -` with a chat completion body on stdin
    GithubModels { endpoint: String },
    /// `gh copilot explain <prompt>`; the model and system prompt are not used
    Explain,
}

impl CliStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::GithubModels { .. } => "github-models",
            Self::Explain => "explain",
        }
    }
}

/// Generation backend that shells out to the GitHub CLI.
///
/// Every call runs a fresh child process. The child is killed when the
/// per-call timeout expires or when the calling task is dropped.
pub struct GhCliBackend {
    binary: PathBuf,
    strategy: CliStrategy,
    timeout: Duration,
}

impl GhCliBackend {
    pub fn new(binary: impl Into<PathBuf>, strategy: CliStrategy, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            strategy,
            timeout,
        }
    }

    async fn run(
        &self,
        role: &str,
        args: &[&str],
        stdin: Option<Vec<u8>>,
    ) -> Result<String, GenerationError> {
        let io_error = |source: std::io::Error| GenerationError::Io {
            role: role.to_string(),
            source,
        };

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(io_error)?;

        let exchange = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                match pipe.write_all(&input).await {
                    // The child may exit without draining stdin; its exit status tells the story.
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!("[{role}] backend closed stdin early");
                    }
                    other => other?,
                }
            }
            child.wait_with_output().await
        };

        let output = match timeout(self.timeout, exchange).await {
            Ok(result) => result.map_err(io_error)?,
            Err(_) => {
                return Err(GenerationError::Timeout {
                    role: role.to_string(),
                    timeout_ms: millis(self.timeout),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            error!("[{role}] gh exited with code {code}: {stderr}");
            return Err(GenerationError::NonZeroExit {
                role: role.to_string(),
                code,
                stderr,
            });
        }

        Ok(stdout)
    }
}

#[async_trait]
impl GenerationBackend for GhCliBackend {
    async fn generate(
        &self,
        role: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        info!(
            "[{role}] Invoking gh (strategy={}, model={model})",
            self.strategy.name()
        );

        match &self.strategy {
            CliStrategy::GithubModels { endpoint } => {
                let body = serde_json::to_vec(&ChatRequest::new(model, system_prompt, user_prompt))
                    .map_err(|e| GenerationError::InvalidResponse {
                        role: role.to_string(),
                        reason: format!("failed to encode request body: {e}"),
                    })?;

                let stdout = self
                    .run(
                        role,
                        &[
                            "api",
                            "--method",
                            "POST",
                            endpoint.as_str(),
                            "--header",
                            "Content-Type: application/json",
                            "--input",
                            "-",
                        ],
                        Some(body),
                    )
                    .await?;

                extract_content(role, &stdout)
            }
            CliStrategy::Explain => {
                let stdout = self
                    .run(role, &["copilot", "explain", user_prompt], None)
                    .await?;
                Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Instant;

    fn fake_gh(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("gh");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn models(endpoint: &str) -> CliStrategy {
        CliStrategy::GithubModels {
            endpoint: endpoint.to_string(),
        }
    }

    #[tokio::test]
    async fn github_models_returns_first_choice() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the first three arguments back as the completion
        let gh = fake_gh(
            dir.path(),
            r#"cat > /dev/null
printf '{"choices":[{"message":{"content":"%s %s %s"}}]}' "$1" "$2" "$3""#,
        );
        let backend = GhCliBackend::new(gh, models("https://example.test/chat"), Duration::from_secs(5));

        let text = backend
            .generate("TechnicalAnalyzer", "gpt-4.1", "sys", "usr")
            .await
            .unwrap();

        assert_eq!(text, "api --method POST");
    }

    #[tokio::test]
    async fn github_models_sends_chat_body_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let captured = dir.path().join("body.json");
        let gh = fake_gh(
            dir.path(),
            &format!(
                r#"cat > {}
printf '{{"choices":[{{"message":{{"content":"ok"}}}}]}}'"#,
                captured.display()
            ),
        );
        let backend = GhCliBackend::new(gh, models("https://example.test/chat"), Duration::from_secs(5));

        backend
            .generate("RootCause", "gpt-4o-mini", "be precise", "why did it fail?")
            .await
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(captured).unwrap()).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "be precise");
        assert_eq!(body["messages"][1]["content"], "why did it fail?");
    }

    #[tokio::test]
    async fn explain_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let gh = fake_gh(dir.path(), r#"echo "explained: $3""#);
        let backend = GhCliBackend::new(gh, CliStrategy::Explain, Duration::from_secs(5));

        let text = backend
            .generate("Severity", "ignored", "ignored", "NPE in checkout")
            .await
            .unwrap();

        assert_eq!(text, "explained: NPE in checkout");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let gh = fake_gh(dir.path(), "echo 'auth required' >&2\nexit 4");
        let backend = GhCliBackend::new(gh, CliStrategy::Explain, Duration::from_secs(5));

        let err = backend.generate("BugWriter", "m", "s", "u").await.unwrap_err();

        match err {
            GenerationError::NonZeroExit { role, code, stderr } => {
                assert_eq!(role, "BugWriter");
                assert_eq!(code, 4);
                assert_eq!(stderr, "auth required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let gh = fake_gh(dir.path(), "sleep 10");
        let backend = GhCliBackend::new(gh, CliStrategy::Explain, Duration::from_millis(200));

        let started = Instant::now();
        let err = backend.generate("StoryWriter", "m", "s", "u").await.unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { timeout_ms: 200, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_binary_is_io_error() {
        let backend = GhCliBackend::new(
            "/nonexistent/storywriter/gh",
            CliStrategy::Explain,
            Duration::from_secs(1),
        );

        let err = backend.generate("RootCause", "m", "s", "u").await.unwrap_err();

        assert!(matches!(err, GenerationError::Io { .. }));
    }

    #[tokio::test]
    async fn unreadable_completion_is_invalid_response() {
        let dir = tempfile::tempdir().unwrap();
        let gh = fake_gh(dir.path(), "cat > /dev/null\necho 'not json'");
        let backend = GhCliBackend::new(gh, models("https://example.test/chat"), Duration::from_secs(5));

        let err = backend.generate("Severity", "m", "s", "u").await.unwrap_err();

        assert!(matches!(err, GenerationError::InvalidResponse { .. }));
    }
}
