//! Tools: described capabilities that can be plugged into a task as steps.

use crate::context::Context;
use crate::error::BoxError;
use crate::step::{Step, StepName};
use async_trait::async_trait;
use std::fmt::Debug;

/// Descriptive information about a tool.
///
/// The `id` is supplied by the tool author and must stay stable across
/// releases; nothing is derived from the tool's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolMetadata {
    /// Stable identifier.
    pub id: String,
    /// Human readable name, also used as the step name.
    pub name: String,
    /// Search keywords.
    pub keywords: Vec<String>,
    /// Free-form description of the tool's input and output.
    pub spec: String,
}

impl ToolMetadata {
    /// Creates metadata without keywords or description.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            keywords: Vec::new(),
            spec: String::new(),
        }
    }

    /// Replaces the keywords.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the input/output description.
    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = spec.into();
        self
    }
}

/// An external capability with an `execute` entry point.
///
/// Wrap a tool in a [`ToolStep`] to run it as part of a task.
#[async_trait]
pub trait Tool<T>: Send + Sync + Debug
where
    T: Send + 'static,
{
    /// Returns the tool's description.
    fn metadata(&self) -> &ToolMetadata;

    /// Runs the tool on `input`.
    async fn execute(&self, input: T, ctx: &mut Context<T>) -> Result<T, BoxError>;
}

/// Runs a [`Tool`] as a [`Step`] named after the tool.
///
/// # Examples
///
/// ```
/// use tsunagu_core::{BoxError, Context, Step, Tool, ToolMetadata, ToolStep};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Trim {
///     metadata: ToolMetadata,
/// }
///
/// #[async_trait]
/// impl Tool<String> for Trim {
///     fn metadata(&self) -> &ToolMetadata {
///         &self.metadata
///     }
///
///     async fn execute(&self, input: String, _ctx: &mut Context<String>) -> Result<String, BoxError> {
///         Ok(input.trim().to_string())
///     }
/// }
///
/// let step = ToolStep::new(Trim { metadata: ToolMetadata::new("text.trim", "trim") });
/// assert_eq!(Step::<String>::name(&step).as_str(), "trim");
/// ```
#[derive(Debug)]
pub struct ToolStep<Tl> {
    tool: Tl,
}

impl<Tl> ToolStep<Tl> {
    /// Wraps `tool`.
    pub fn new(tool: Tl) -> Self {
        Self { tool }
    }

    /// Returns the wrapped tool.
    pub fn tool(&self) -> &Tl {
        &self.tool
    }
}

#[async_trait]
impl<T, Tl> Step<T> for ToolStep<Tl>
where
    T: Send + 'static,
    Tl: Tool<T>,
{
    async fn execute(&self, input: T, ctx: &mut Context<T>) -> Result<T, BoxError> {
        self.tool.execute(input, ctx).await
    }

    fn name(&self) -> StepName {
        StepName::new(self.tool.metadata().name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        metadata: ToolMetadata,
    }

    #[async_trait]
    impl Tool<u32> for Counter {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn execute(&self, input: u32, ctx: &mut Context<u32>) -> Result<u32, BoxError> {
            ctx.insert("counted", true);
            Ok(input + 1)
        }
    }

    fn counter() -> Counter {
        Counter {
            metadata: ToolMetadata::new("math.increment", "increment")
                .with_keywords(["math", "counter"])
                .with_spec("u32 -> u32"),
        }
    }

    #[test]
    fn test_tool_metadata_builder() {
        let tool = counter();
        assert_eq!(tool.metadata().id, "math.increment");
        assert_eq!(tool.metadata().keywords, vec!["math", "counter"]);
        assert_eq!(tool.metadata().spec, "u32 -> u32");
    }

    #[test]
    fn test_tool_step_runs_tool() {
        let step = ToolStep::new(counter());
        let mut ctx = Context::<u32>::new();

        let output = tokio_test::block_on(step.execute(1, &mut ctx));

        assert_eq!(output.ok(), Some(2));
        assert_eq!(ctx.get::<bool>("counted"), Some(&true));
        assert_eq!(Step::<u32>::name(&step).as_str(), "increment");
    }
}
