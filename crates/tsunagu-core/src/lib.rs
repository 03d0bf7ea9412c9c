//! Core traits and types for the tsunagu task/pipeline runner.
//!
//! This crate provides the building blocks without the runner itself.
//! Library authors should depend on this crate to implement custom steps
//! and tools.
//!
//! # Core Types
//!
//! - [`Step`] - The core trait for a unit of work
//! - [`FnStep`] - Adapts an async function into a step
//! - [`Tool`] / [`ToolStep`] - Described capabilities runnable as steps
//! - [`Context`] - Application data plus the [`StepLog`] of a run
//! - [`StepRecord`] - One entry of the step log
//! - [`TaskError`], [`PipelineError`], [`ConfigError`] - Error types

mod context;
mod error;
mod record;
mod step;
mod tool;

pub use context::{Context, ContextData, ContextKey};
pub use error::{
    BoxError, ConfigError, ErrorCode, PipelineError, RecordError, SharedError, TaskError,
};
pub use record::{RecordId, StepLog, StepRecord, StepStatus};
pub use step::{FnStep, Step, StepName};
pub use tool::{Tool, ToolMetadata, ToolStep};
