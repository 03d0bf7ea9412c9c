//! Sequential async tasks and pipelines with a shared run record.
//!
//! A [`Task`] runs an ordered list of steps, feeding each step's output to
//! the next. A [`Pipeline`] runs an ordered list of tasks the same way,
//! optionally reshaping the value between tasks with a selector. Every
//! step invocation of a run is recorded in the run's [`Context`], so a
//! failed run can be inspected step by step.
//!
//! # Example
//!
//! ```rust
//! use tsunagu::prelude::*;
//!
//! async fn prefix(input: String) -> Result<String, BoxError> {
//!     Ok(format!("a:{input}"))
//! }
//!
//! async fn suffix(input: String) -> Result<String, BoxError> {
//!     Ok(format!("{input}:b"))
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let task = Task::new("wrap")
//!     .with_step(FnStep::new("prefix", prefix))
//!     .with_step(FnStep::new("suffix", suffix));
//!
//! let mut ctx = Context::new();
//! let result = task.run("1".to_string(), &mut ctx).await.expect("task failed");
//!
//! assert_eq!(result.output, "a:1:b");
//! assert_eq!(ctx.steps().len(), 2);
//! # }
//! ```

mod pipeline;
mod task;

// Re-export core types
pub use tsunagu_core::*;

pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineConfiguration, PipelineOptions, PipelineOutput, Selector,
};
pub use task::{Task, TaskOptions, TaskOutput};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoxError, ConfigError, Context, ContextData, FnStep, Pipeline, PipelineConfiguration,
        PipelineError, Step, StepName, StepStatus, Task, TaskError, TaskOutput, Tool,
        ToolMetadata, ToolStep,
    };
}
