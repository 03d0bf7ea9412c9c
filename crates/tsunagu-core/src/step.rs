//! Step trait and related types.

use crate::context::Context;
use crate::error::BoxError;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::future::Future;

/// Step name wrapper.
///
/// Names identify steps in the step log and in error reports. They are not
/// required to be unique, and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An asynchronous unit of work turning one value into the next.
///
/// A step receives the value produced by the previous step of its task (or
/// the task input, for the first step) together with the shared run
/// context, and returns the value handed to the next step.
///
/// Steps must not open records in the context's step log themselves; the
/// task runner does that on their behalf.
///
/// # Examples
///
/// ```
/// use tsunagu_core::{BoxError, Context, Step, StepName};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Shout;
///
/// #[async_trait]
/// impl Step<String> for Shout {
///     async fn execute(&self, input: String, ctx: &mut Context<String>) -> Result<String, BoxError> {
///         ctx.insert("shouted", true);
///         Ok(input.to_uppercase())
///     }
///
///     fn name(&self) -> StepName {
///         StepName::new("shout")
///     }
/// }
/// ```
#[async_trait]
pub trait Step<T>: Send + Sync + Debug
where
    T: Send + 'static,
{
    /// Executes the step logic.
    ///
    /// Any error is opaque to the runner. Returning a `TaskError` (for
    /// example from a nested task run) propagates it without re-wrapping.
    async fn execute(&self, input: T, ctx: &mut Context<T>) -> Result<T, BoxError>;

    /// Returns the step name.
    fn name(&self) -> StepName;
}

#[async_trait]
impl<T, S> Step<T> for Box<S>
where
    T: Send + 'static,
    S: Step<T> + ?Sized,
{
    async fn execute(&self, input: T, ctx: &mut Context<T>) -> Result<T, BoxError> {
        (**self).execute(input, ctx).await
    }

    fn name(&self) -> StepName {
        (**self).name()
    }
}

/// A step backed by an async function that only needs the input value.
///
/// Steps that read or write the context should implement [`Step`]
/// directly.
///
/// # Examples
///
/// ```
/// use tsunagu_core::{BoxError, FnStep, Step};
///
/// async fn greet(name: String) -> Result<String, BoxError> {
///     Ok(format!("hello, {name}"))
/// }
///
/// let step = FnStep::new("greet", greet);
/// assert_eq!(step.name().as_str(), "greet");
/// ```
pub struct FnStep<F> {
    name: StepName,
    f: F,
}

impl<F> FnStep<F> {
    /// Creates a step with the given name around `f`.
    pub fn new(name: impl Into<StepName>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Returns the step name.
    pub fn name(&self) -> &StepName {
        &self.name
    }
}

impl<F> Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<T, F, Fut> Step<T> for FnStep<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    async fn execute(&self, input: T, _ctx: &mut Context<T>) -> Result<T, BoxError> {
        (self.f)(input).await
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }
}
