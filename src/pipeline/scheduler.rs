use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::task::{self, JoinError, JoinSet};

use super::Stage;
use crate::agents::Agents;
use crate::artifact::{AgentResult, Artifact, BugReport, SeverityAssessment, UserStory};
use crate::backend::GenerationBackend;
use crate::config::AgentsConfig;
use crate::error::{GenerationError, PipelineError, Result};
use crate::event::FailureEvent;
use crate::timing::{millis, timed, Timed};

/// What a finished stage produced.
#[derive(Debug)]
enum StageOutput {
    Text(String),
    Bug(BugReport),
    Story(UserStory),
    Severity(SeverityAssessment),
}

impl StageOutput {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Upstream text handed to a stage, limited to its declared dependencies.
#[derive(Debug, Default)]
struct StageInputs {
    technical_analysis: Option<String>,
    root_cause: Option<String>,
}

impl StageInputs {
    fn collect(stage: Stage, completed: &IndexMap<Stage, Timed<StageOutput>>) -> Result<Self> {
        let mut inputs = Self::default();

        for &dependency in stage.dependencies() {
            let missing = PipelineError::MissingInput { stage, dependency };
            let text = completed
                .get(&dependency)
                .and_then(|done| done.value.as_text())
                .ok_or(missing)?
                .to_string();

            match dependency {
                Stage::TechnicalAnalysis => inputs.technical_analysis = Some(text),
                Stage::RootCause => inputs.root_cause = Some(text),
                _ => return Err(PipelineError::MissingInput { stage, dependency }),
            }
        }

        Ok(inputs)
    }

    fn require(&self, stage: Stage, dependency: Stage) -> Result<&str> {
        let value = match dependency {
            Stage::TechnicalAnalysis => self.technical_analysis.as_deref(),
            Stage::RootCause => self.root_cause.as_deref(),
            _ => None,
        };
        value.ok_or(PipelineError::MissingInput { stage, dependency })
    }
}

type StageResult = std::result::Result<Result<Timed<StageOutput>>, Box<dyn Any + Send>>;

/// Drives one failure event through the five-stage agent graph.
///
/// Every stage runs as its own task on the tokio runtime and is spawned as
/// soon as all of its dependencies have produced output, so the three
/// writers run in parallel once the root cause is known.
///
/// The first generation failure aborts every task still running; no
/// partial artifact is returned. Dropping the future returned by
/// [`Orchestrator::run`] aborts the in-flight tasks as well.
pub struct Orchestrator {
    agents: Arc<Agents>,
}

impl Orchestrator {
    pub fn new(agents: Agents) -> Self {
        Self {
            agents: Arc::new(agents),
        }
    }

    pub fn from_config(backend: Arc<dyn GenerationBackend>, config: &AgentsConfig) -> Self {
        Self::new(Agents::new(backend, config))
    }

    /// Runs the pipeline, giving up with [`PipelineError::Interrupted`] when
    /// `shutdown` resolves first.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::run`], plus `Interrupted`.
    pub async fn run_until<S>(&self, event: FailureEvent, shutdown: S) -> Result<Artifact>
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run(event) => result,
            () = shutdown => {
                warn!("Orchestrator pipeline interrupted, cancelling running agents");
                Err(PipelineError::Interrupted)
            }
        }
    }

    /// Processes a failure event through the full agent graph.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if any generation call fails, a stage
    /// panics, or a stage task is cancelled.
    pub async fn run(&self, event: FailureEvent) -> Result<Artifact> {
        info!(
            "Orchestrator starting pipeline for event: source={}, test={}",
            event.source,
            event.test_name.as_deref().unwrap_or("-")
        );

        let event = Arc::new(event);
        let graph_start = Instant::now();

        let mut completed: IndexMap<Stage, Timed<StageOutput>> = IndexMap::new();
        let mut pending: Vec<Stage> = Stage::ALL.to_vec();
        let mut in_flight: HashMap<task::Id, Stage> = HashMap::new();
        let mut tasks: JoinSet<(Stage, StageResult)> = JoinSet::new();

        loop {
            let (ready, blocked): (Vec<Stage>, Vec<Stage>) =
                std::mem::take(&mut pending).into_iter().partition(|stage| {
                    stage
                        .dependencies()
                        .iter()
                        .all(|dependency| completed.contains_key(dependency))
                });
            pending = blocked;

            for stage in ready {
                let inputs = StageInputs::collect(stage, &completed)?;
                let agents = Arc::clone(&self.agents);
                let event = Arc::clone(&event);

                debug!("{stage} ready, spawning");
                let handle = tasks.spawn(async move {
                    let result = AssertUnwindSafe(execute(&agents, stage, &event, inputs))
                        .catch_unwind()
                        .await;
                    (stage, result)
                });
                in_flight.insert(handle.id(), stage);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, (stage, Ok(Ok(output))))) => {
                    debug!("{stage} finished in {}ms", output.elapsed_ms());
                    in_flight.remove(&id);
                    completed.insert(stage, output);
                }
                Ok((_, (stage, Ok(Err(e))))) => {
                    tasks.abort_all();
                    error!("Agent pipeline failed at {stage}: {e}");
                    return Err(e);
                }
                Ok((_, (stage, Err(panic)))) => {
                    tasks.abort_all();
                    let message = panic_message(panic.as_ref());
                    error!("{stage} panicked: {message}");
                    return Err(PipelineError::Panicked { stage, message });
                }
                Err(join_error) => {
                    tasks.abort_all();
                    return Err(join_failure(&in_flight, &join_error));
                }
            }
        }

        let total_ms = millis(graph_start.elapsed());
        let artifact = assemble(completed, total_ms)?;

        info!(
            "Orchestrator pipeline completed in {}ms (tech={}ms root={}ms bug={}ms story={}ms severity={}ms). Severity={}",
            artifact.total_ms,
            artifact.technical_analysis.duration_ms,
            artifact.root_cause.duration_ms,
            artifact.bug_report.duration_ms,
            artifact.user_story.duration_ms,
            artifact.severity.duration_ms,
            artifact.severity.level
        );

        Ok(artifact)
    }
}

/// Runs one stage. Only the agent's own work is inside the timed window.
async fn execute(
    agents: &Agents,
    stage: Stage,
    event: &FailureEvent,
    inputs: StageInputs,
) -> Result<Timed<StageOutput>> {
    let generation_error = |source: GenerationError| PipelineError::Generation { stage, source };

    let result = match stage {
        Stage::TechnicalAnalysis => {
            timed(agents.technical_analyzer.analyze(event))
                .await
                .transpose()
                .map_err(generation_error)?
                .map(StageOutput::Text)
        }
        Stage::RootCause => {
            let technical_analysis = inputs.require(stage, Stage::TechnicalAnalysis)?;
            timed(agents.root_cause.analyze(event, technical_analysis))
                .await
                .transpose()
                .map_err(generation_error)?
                .map(StageOutput::Text)
        }
        Stage::BugWriter => {
            let technical_analysis = inputs.require(stage, Stage::TechnicalAnalysis)?;
            let root_cause = inputs.require(stage, Stage::RootCause)?;
            timed(agents.bug_writer.write(event, technical_analysis, root_cause))
                .await
                .transpose()
                .map_err(generation_error)?
                .map(StageOutput::Bug)
        }
        Stage::StoryWriter => {
            let root_cause = inputs.require(stage, Stage::RootCause)?;
            timed(agents.story_writer.write(event, root_cause))
                .await
                .transpose()
                .map_err(generation_error)?
                .map(StageOutput::Story)
        }
        Stage::Severity => {
            let technical_analysis = inputs.require(stage, Stage::TechnicalAnalysis)?;
            let root_cause = inputs.require(stage, Stage::RootCause)?;
            timed(agents.severity.assess(event, technical_analysis, root_cause))
                .await
                .transpose()
                .map_err(generation_error)?
                .map(StageOutput::Severity)
        }
    };

    Ok(result)
}

/// Maps a task that did not run to completion back to its stage.
///
/// Panics are caught inside the task, so this is normally a cancellation.
fn join_failure(in_flight: &HashMap<task::Id, Stage>, join_error: &JoinError) -> PipelineError {
    let Some(&stage) = in_flight.get(&join_error.id()) else {
        error!("Unknown agent task did not complete: {join_error}");
        return PipelineError::Interrupted;
    };

    error!("Agent task for {stage} did not complete: {join_error}");
    if join_error.is_cancelled() {
        PipelineError::Cancelled { stage }
    } else {
        PipelineError::Panicked {
            stage,
            message: join_error.to_string(),
        }
    }
}

/// Merges stage outputs into the artifact, attaching the measured durations.
fn assemble(
    mut completed: IndexMap<Stage, Timed<StageOutput>>,
    total_ms: u64,
) -> Result<Artifact> {
    let mut take = |stage: Stage| {
        completed
            .swap_remove(&stage)
            .map(|done| (done.elapsed_ms(), done.value))
            .ok_or(PipelineError::Incomplete { stage })
    };
    let mut text = |stage: Stage| -> Result<AgentResult<String>> {
        match take(stage)? {
            (ms, StageOutput::Text(text)) => Ok(AgentResult::new(text, ms)),
            _ => Err(PipelineError::Incomplete { stage }),
        }
    };

    let technical_analysis = text(Stage::TechnicalAnalysis)?;
    let root_cause = text(Stage::RootCause)?;

    let bug_report = match take(Stage::BugWriter)? {
        (ms, StageOutput::Bug(report)) => report.with_duration(ms),
        _ => return Err(PipelineError::Incomplete { stage: Stage::BugWriter }),
    };
    let user_story = match take(Stage::StoryWriter)? {
        (ms, StageOutput::Story(story)) => story.with_duration(ms),
        _ => return Err(PipelineError::Incomplete { stage: Stage::StoryWriter }),
    };
    let severity = match take(Stage::Severity)? {
        (ms, StageOutput::Severity(severity)) => severity.with_duration(ms),
        _ => return Err(PipelineError::Incomplete { stage: Stage::Severity }),
    };

    Ok(Artifact {
        technical_analysis,
        root_cause,
        bug_report,
        user_story,
        severity,
        total_ms,
        generated_at: Utc::now(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
