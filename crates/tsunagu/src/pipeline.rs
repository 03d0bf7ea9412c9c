//! Sequential task runner with input selection between tasks.

use crate::task::Task;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use tsunagu_core::{ConfigError, Context, ContextData, PipelineError, TaskError};

/// Picks a task's input from the pipeline's running output.
pub type Selector<T> = Arc<dyn Fn(T, &Context<T>) -> T + Send + Sync>;

/// One stage of a [`Pipeline`]: a task and an optional selector.
///
/// Without a selector the task receives the previous output unchanged.
pub struct PipelineConfiguration<T>
where
    T: Send + 'static,
{
    selector: Option<Selector<T>>,
    task: Arc<Task<T>>,
}

impl<T> PipelineConfiguration<T>
where
    T: Send + 'static,
{
    /// Creates a stage that passes the previous output through unchanged.
    pub fn new(task: impl Into<Arc<Task<T>>>) -> Self {
        Self {
            selector: None,
            task: task.into(),
        }
    }

    /// Creates a stage whose task input is `selector(previous_output, ctx)`.
    pub fn with_selector<F>(task: impl Into<Arc<Task<T>>>, selector: F) -> Self
    where
        F: Fn(T, &Context<T>) -> T + Send + Sync + 'static,
    {
        Self {
            selector: Some(Arc::new(selector)),
            task: task.into(),
        }
    }

    /// Returns the stage's task.
    pub fn task(&self) -> &Task<T> {
        &self.task
    }

    /// Returns `true` if the stage reshapes its input.
    pub fn has_selector(&self) -> bool {
        self.selector.is_some()
    }

    fn select(&self, value: T, ctx: &Context<T>) -> T {
        match &self.selector {
            Some(selector) => selector(value, ctx),
            None => value,
        }
    }
}

impl<T> Clone for PipelineConfiguration<T>
where
    T: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            selector: self.selector.clone(),
            task: Arc::clone(&self.task),
        }
    }
}

impl<T> From<Task<T>> for PipelineConfiguration<T>
where
    T: Send + 'static,
{
    fn from(task: Task<T>) -> Self {
        Self::new(task)
    }
}

impl<T> From<Arc<Task<T>>> for PipelineConfiguration<T>
where
    T: Send + 'static,
{
    fn from(task: Arc<Task<T>>) -> Self {
        Self::new(task)
    }
}

impl<T> fmt::Debug for PipelineConfiguration<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfiguration")
            .field("task", &self.task)
            .field("selector", &self.selector.is_some())
            .finish()
    }
}

/// Construction input for a [`Pipeline`].
pub struct PipelineOptions<T>
where
    T: Send + 'static,
{
    pub name: String,
    pub tasks: Vec<PipelineConfiguration<T>>,
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutput<T> {
    /// The last task's output.
    pub output: T,
    /// The run context, holding the step records of every task.
    pub context: Context<T>,
}

/// An ordered, non-empty list of tasks sharing one value and one context.
///
/// # Examples
///
/// ```
/// use tsunagu::prelude::*;
///
/// async fn greet(name: String) -> Result<String, BoxError> {
///     Ok(format!("hello, {name}"))
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let pipeline = Pipeline::builder("greeting")
///     .task(Task::new("greet").with_step(FnStep::new("greet", greet)))
///     .select(|out: String, _ctx: &Context<String>| out.to_uppercase(), Task::new("pass"))
///     .build()
///     .expect("valid pipeline");
///
/// let result = pipeline
///     .run("ada".to_string(), ContextData::new())
///     .await
///     .expect("pipeline succeeds");
/// assert_eq!(result.output, "HELLO, ADA");
/// # }
/// ```
pub struct Pipeline<T>
where
    T: Send + 'static,
{
    name: String,
    configurations: Vec<PipelineConfiguration<T>>,
}

impl<T> fmt::Debug for Pipeline<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("configurations", &self.configurations)
            .finish()
    }
}

impl<T> TryFrom<PipelineOptions<T>> for Pipeline<T>
where
    T: Send + 'static,
{
    type Error = ConfigError;

    fn try_from(options: PipelineOptions<T>) -> Result<Self, Self::Error> {
        Self::new(options.name, options.tasks)
    }
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// Creates a pipeline. Fails if `configurations` is empty.
    pub fn new<I, C>(name: impl Into<String>, configurations: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = C>,
        C: Into<PipelineConfiguration<T>>,
    {
        let name = name.into();
        let configurations: Vec<_> = configurations.into_iter().map(Into::into).collect();
        if configurations.is_empty() {
            return Err(ConfigError::EmptyPipeline { pipeline: name });
        }
        Ok(Self {
            name,
            configurations,
        })
    }

    /// Creates a new pipeline builder.
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<T> {
        PipelineBuilder::new(name)
    }

    /// Returns the pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages, in run order.
    pub fn configurations(&self) -> &[PipelineConfiguration<T>] {
        &self.configurations
    }

    /// Returns the number of tasks.
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Always `false` for a built pipeline.
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

impl<T> Pipeline<T>
where
    T: Clone + Send + 'static,
{
    /// Runs every task in order on a fresh context built from `data`.
    ///
    /// On failure no further task runs, and the returned [`PipelineError`]
    /// carries the context together with the errors of every failed record
    /// in its step log.
    pub async fn run(
        &self,
        input: T,
        data: ContextData,
    ) -> Result<PipelineOutput<T>, PipelineError<T>> {
        let mut context = Context::with_data(data);

        match self.run_with_context(input, &mut context).await {
            Ok(output) => {
                info!(
                    "Pipeline '{}' completed successfully in {:?}",
                    self.name,
                    context.elapsed()
                );
                Ok(PipelineOutput { output, context })
            }
            Err(_) => {
                let error = PipelineError::from_context(self.name.as_str(), context);
                warn!("{}", error);
                Err(error)
            }
        }
    }

    /// Runs every task in order on a caller-owned context.
    ///
    /// Returns the output of the last task, or the error of the task that
    /// failed. Useful for running a pipeline from inside a step.
    pub async fn run_with_context(&self, input: T, ctx: &mut Context<T>) -> Result<T, TaskError> {
        info!(
            "Pipeline '{}' starting with {} task(s)",
            self.name,
            self.configurations.len()
        );

        let mut output = input;
        for configuration in &self.configurations {
            let task_input = configuration.select(output, ctx);
            match configuration.task.run(task_input, ctx).await {
                Ok(task_output) => output = task_output.output,
                Err(error) => {
                    warn!(
                        "Pipeline '{}' stopped at task '{}'",
                        self.name,
                        configuration.task.name()
                    );
                    return Err(error);
                }
            }
        }

        Ok(output)
    }
}

/// Builder for constructing [`Pipeline`] instances.
pub struct PipelineBuilder<T>
where
    T: Send + 'static,
{
    name: String,
    configurations: Vec<PipelineConfiguration<T>>,
}

impl<T> PipelineBuilder<T>
where
    T: Send + 'static,
{
    /// Creates a builder without tasks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configurations: Vec::new(),
        }
    }

    /// Adds a task receiving the previous output unchanged.
    pub fn task(mut self, task: impl Into<Arc<Task<T>>>) -> Self {
        self.configurations.push(PipelineConfiguration::new(task));
        self
    }

    /// Adds a task whose input is chosen by `selector`.
    pub fn select<F>(mut self, selector: F, task: impl Into<Arc<Task<T>>>) -> Self
    where
        F: Fn(T, &Context<T>) -> T + Send + Sync + 'static,
    {
        self.configurations
            .push(PipelineConfiguration::with_selector(task, selector));
        self
    }

    /// Adds a prepared configuration.
    pub fn configuration(mut self, configuration: PipelineConfiguration<T>) -> Self {
        self.configurations.push(configuration);
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Result<Pipeline<T>, ConfigError> {
        Pipeline::new(self.name, self.configurations)
    }
}
