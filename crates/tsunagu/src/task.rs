//! Sequential step runner.

use std::fmt;
use tracing::{debug, info, warn};
use tsunagu_core::{ConfigError, Context, RecordError, RecordId, Step, StepName, TaskError};

/// An ordered list of steps run against one evolving value.
///
/// Each step receives the previous step's output; the first receives the
/// task input. Every run opens one record per step in the context's step
/// log before the first step executes.
pub struct Task<T>
where
    T: Send + 'static,
{
    name: String,
    steps: Vec<Box<dyn Step<T>>>,
}

/// Construction input for a [`Task`].
pub struct TaskOptions<T>
where
    T: Send + 'static,
{
    pub name: String,
    pub steps: Vec<Box<dyn Step<T>>>,
}

impl<T> TaskOptions<T>
where
    T: Send + 'static,
{
    /// Creates options without steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }
}

/// Result of a successful task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput<T> {
    /// The last step's output.
    pub output: T,
}

impl<T> fmt::Debug for Task<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> From<TaskOptions<T>> for Task<T>
where
    T: Send + 'static,
{
    fn from(options: TaskOptions<T>) -> Self {
        Self {
            name: options.name,
            steps: options.steps,
        }
    }
}

impl<T> Task<T>
where
    T: Send + 'static,
{
    /// Creates a task without steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step, builder style.
    pub fn with_step<S: Step<T> + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends steps to the end of the task.
    ///
    /// Only affects later runs. Fails if `steps` is empty.
    pub fn push<I>(&mut self, steps: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Box<dyn Step<T>>>,
    {
        let before = self.steps.len();
        self.steps.extend(steps);
        if self.steps.len() == before {
            return Err(ConfigError::NoSteps {
                task: self.name.clone(),
            });
        }
        Ok(self)
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dot-joined names of the steps, in order.
    ///
    /// Meant for diagnostics; two tasks may share an id.
    pub fn id(&self) -> String {
        self.step_names()
            .map(|name| name.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the step names, in run order.
    pub fn step_names(&self) -> impl Iterator<Item = StepName> + '_ {
        self.steps.iter().map(|step| step.name())
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the task has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<T> Task<T>
where
    T: Clone + Send + 'static,
{
    /// Runs every step in order, threading the value and the context.
    ///
    /// The first failing step aborts the run. Its error is wrapped in a
    /// `FALL_THROUGH` [`TaskError`], unless it already is a `TaskError`,
    /// which is returned as is. Either way the error is also stored on the
    /// step's record. Steps that already succeeded are not rolled back.
    pub async fn run(&self, input: T, ctx: &mut Context<T>) -> Result<TaskOutput<T>, TaskError> {
        let task_id = self.id();
        debug!(
            "Task '{}' ({}) starting with {} step(s)",
            self.name,
            task_id,
            self.steps.len()
        );

        let records = ctx.open_records(self.step_names());
        let mut current = input;

        for (step, record) in self.steps.iter().zip(records) {
            if let Err(lost) = ctx.begin_record(record, current.clone()) {
                return Err(self.record_lost(&task_id, step.name(), record, lost));
            }

            match step.execute(current, ctx).await {
                Ok(output) => {
                    if let Err(lost) = ctx.succeed_record(record, output.clone()) {
                        return Err(self.record_lost(&task_id, step.name(), record, lost));
                    }
                    info!(
                        "Task '{}' step '{}' completed successfully",
                        self.name,
                        step.name()
                    );
                    current = output;
                }
                Err(raw) => {
                    let error = match raw.downcast::<TaskError>() {
                        Ok(task_error) => *task_error,
                        Err(raw) => TaskError::fall_through(
                            self.name.as_str(),
                            task_id.as_str(),
                            step.name(),
                            record,
                            raw,
                        ),
                    };
                    warn!("Task '{}' step '{}' failed: {}", self.name, step.name(), error);
                    if let Err(lost) = ctx.fail_record(record, error.clone()) {
                        warn!(
                            "Task '{}' could not record the failure of step '{}': {}",
                            self.name,
                            step.name(),
                            lost
                        );
                    }
                    return Err(error);
                }
            }
        }

        Ok(TaskOutput { output: current })
    }

    /// Fails the run when a step's record is no longer in the context.
    fn record_lost(
        &self,
        task_id: &str,
        step: StepName,
        record: RecordId,
        lost: RecordError,
    ) -> TaskError {
        warn!("Task '{}' lost the record of step '{}': {}", self.name, step, lost);
        TaskError::fall_through(self.name.as_str(), task_id, step, record, Box::new(lost))
    }
}
