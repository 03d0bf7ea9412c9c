//! Task, pipeline and configuration error types.

use crate::context::Context;
use crate::record::{RecordId, StepStatus};
use crate::step::StepName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque error raised by a step implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A raw step error shared between a [`TaskError`] and the step log.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Classifies why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCode {
    /// A step failed and the error fell through the task unhandled.
    #[serde(rename = "FALL_THROUGH")]
    FallThrough,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::FallThrough => write!(f, "FALL_THROUGH"),
        }
    }
}

/// A task run aborted because one of its steps failed.
///
/// Cloning is cheap: the underlying causes are shared. The same value is
/// stored on the failing step's record and returned to the caller.
#[derive(Error, Debug, Clone)]
#[error("Task '{task}' failed in step '{step}' [{code}]: {}", join_causes(.errors))]
pub struct TaskError {
    code: ErrorCode,
    task: String,
    task_id: String,
    step: StepName,
    record: RecordId,
    errors: Vec<SharedError>,
}

impl TaskError {
    /// Wraps a raw step error with the `FALL_THROUGH` code.
    pub fn fall_through(
        task: impl Into<String>,
        task_id: impl Into<String>,
        step: StepName,
        record: RecordId,
        cause: BoxError,
    ) -> Self {
        Self {
            code: ErrorCode::FallThrough,
            task: task.into(),
            task_id: task_id.into(),
            step,
            record,
            errors: vec![Arc::from(cause)],
        }
    }

    /// Returns the failure code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the name of the task that failed.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Returns the id (dot-joined step names) of the task that failed.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Returns the name of the failing step.
    pub fn step(&self) -> &StepName {
        &self.step
    }

    /// Returns the handle of the failing step's record in the step log.
    ///
    /// The handle belongs to the task that created the error. When a step
    /// forwards a nested task's `TaskError`, the handle still points at
    /// the nested task's record, not at the record of the forwarding step,
    /// and it indexes the nested task's context, which may differ from the
    /// outer one.
    pub fn record(&self) -> RecordId {
        self.record
    }

    /// Returns the raw errors that caused the failure.
    pub fn errors(&self) -> &[SharedError] {
        &self.errors
    }
}

fn join_causes(errors: &[SharedError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A pipeline run aborted because one of its tasks failed.
///
/// Carries the run's context as it was at the time of failure, including
/// the full step log, so the caller can inspect partial progress.
#[derive(Error)]
#[error("Pipeline '{pipeline}' failed with {} task error(s)", .errors.len())]
pub struct PipelineError<T> {
    pipeline: String,
    context: Context<T>,
    errors: Vec<TaskError>,
}

impl<T> PipelineError<T> {
    /// Builds the error from the failed run's context, collecting the error
    /// of every failed record in its step log.
    pub fn from_context(pipeline: impl Into<String>, context: Context<T>) -> Self {
        let errors = context.steps().failures().cloned().collect();
        Self {
            pipeline: pipeline.into(),
            context,
            errors,
        }
    }

    /// Returns the name of the pipeline that failed.
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the run context at the time of failure.
    pub fn context(&self) -> &Context<T> {
        &self.context
    }

    /// Returns the task errors found in the step log.
    pub fn errors(&self) -> &[TaskError] {
        &self.errors
    }

    /// Consumes the error, returning the run context.
    pub fn into_context(self) -> Context<T> {
        self.context
    }
}

impl<T> fmt::Debug for PipelineError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineError")
            .field("pipeline", &self.pipeline)
            .field("context", &self.context)
            .field("errors", &self.errors)
            .finish()
    }
}

/// A step record could not be updated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    /// The handle points past the end of the context's step log.
    #[error("Step record #{index} is missing from the step log")]
    Missing {
        /// The position the record was opened at.
        index: usize,
    },

    /// The record already reached a terminal status.
    #[error("Step record #{index} is already finished ({status:?})")]
    Finished {
        /// The position of the record.
        index: usize,
        /// The status the record ended with.
        status: StepStatus,
    },
}

/// Invalid task or pipeline configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A pipeline was built without any task.
    #[error("Invalid argument: pipeline '{pipeline}' requires at least one task")]
    EmptyPipeline {
        /// The name of the pipeline.
        pipeline: String,
    },

    /// Steps were pushed onto a task without passing any step.
    #[error("Invalid argument: push on task '{task}' requires at least one step")]
    NoSteps {
        /// The name of the task.
        task: String,
    },
}

impl ConfigError {
    /// Returns `true` if the error stems from an invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ConfigError::EmptyPipeline { .. } | ConfigError::NoSteps { .. }
        )
    }
}
