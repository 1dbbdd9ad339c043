use thiserror::Error;

use crate::pipeline::Stage;

/// Failure of a single Generation Backend call.
///
/// Always fatal to the pipeline run that issued the call.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("[{role}] generation timed out after {timeout_ms}ms")]
    Timeout { role: String, timeout_ms: u64 },

    #[error("[{role}] backend exited with code {code}: {stderr}")]
    NonZeroExit {
        role: String,
        code: i32,
        stderr: String,
    },

    #[error("[{role}] backend I/O error: {source}")]
    Io {
        role: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[{role}] request to generation endpoint failed: {source}")]
    Request {
        role: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{role}] generation endpoint returned status {status}: {body}")]
    Status {
        role: String,
        status: u16,
        body: String,
    },

    #[error("[{role}] unreadable backend response: {reason}")]
    InvalidResponse { role: String, reason: String },
}

/// Failure of a whole pipeline run. No partial artifact is produced.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Agent pipeline failed at {stage}: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: GenerationError,
    },

    #[error("Agent pipeline cancelled while waiting for {stage}")]
    Cancelled { stage: Stage },

    #[error("Agent pipeline interrupted")]
    Interrupted,

    #[error("Agent {stage} panicked: {message}")]
    Panicked { stage: Stage, message: String },

    #[error("Agent {stage} started without the output of {dependency}")]
    MissingInput { stage: Stage, dependency: Stage },

    #[error("Agent pipeline finished without output from {stage}")]
    Incomplete { stage: Stage },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
