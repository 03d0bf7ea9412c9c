//! Step records and the append-only step log.

use crate::error::{RecordError, TaskError};
use crate::step::StepName;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Lifecycle status of a single step invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The step has been scheduled but has not finished.
    Pending,
    /// The step returned a value.
    Success,
    /// The step returned an error.
    Failure,
}

impl StepStatus {
    /// Returns `true` for `Success` and `Failure`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Failure)
    }
}

/// Handle to one record of a [`StepLog`].
///
/// Handles are only created by the log when records are opened, so a
/// runner always finalizes its own record, whatever else has been appended
/// to the log in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

impl RecordId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the position of the record in its log.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One entry of the step log.
#[derive(Debug, Clone)]
pub struct StepRecord<T> {
    name: StepName,
    status: StepStatus,
    input: Option<T>,
    output: Option<T>,
    error: Option<TaskError>,
}

impl<T> StepRecord<T> {
    fn pending(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            input: None,
            output: None,
            error: None,
        }
    }

    /// Returns the name of the step.
    pub fn name(&self) -> &StepName {
        &self.name
    }

    /// Returns the current status.
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// The value the step received, once it has been invoked.
    pub fn input(&self) -> Option<&T> {
        self.input.as_ref()
    }

    /// The value the step produced; only set on success.
    pub fn output(&self) -> Option<&T> {
        self.output.as_ref()
    }

    /// The wrapped failure; only set on failure.
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }
}

/// Append-only log of step records, in execution order.
///
/// A log only exists inside a [`Context`](crate::Context), which hands out
/// shared references to it and nothing else. Records are appended and
/// finalized through the context; they are never removed or reordered, and
/// the log itself can't be built, cloned or swapped from outside this crate.
///
/// ```compile_fail
/// let log = tsunagu_core::StepLog::<u8>::new();
/// ```
///
/// ```compile_fail
/// let mut ctx = tsunagu_core::Context::<u8>::new();
/// let log = ctx.steps_mut();
/// ```
#[derive(Debug)]
pub struct StepLog<T> {
    records: Vec<StepRecord<T>>,
}

impl<T> StepLog<T> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends one pending record per name, returning their handles in the
    /// same order.
    pub(crate) fn open<I>(&mut self, names: I) -> Vec<RecordId>
    where
        I: IntoIterator<Item = StepName>,
    {
        names
            .into_iter()
            .map(|name| {
                self.records.push(StepRecord::pending(name));
                RecordId::new(self.records.len() - 1)
            })
            .collect()
    }

    /// Stores the value a step is about to receive.
    ///
    /// The input is set once; a second call on the same pending record
    /// keeps the first value.
    pub(crate) fn begin(&mut self, id: RecordId, input: T) -> Result<(), RecordError> {
        let record = self.pending_mut(id)?;
        if record.input.is_none() {
            record.input = Some(input);
        }
        Ok(())
    }

    /// Marks a pending record as successful.
    pub(crate) fn succeed(&mut self, id: RecordId, output: T) -> Result<(), RecordError> {
        let record = self.pending_mut(id)?;
        record.status = StepStatus::Success;
        record.output = Some(output);
        Ok(())
    }

    /// Marks a pending record as failed.
    pub(crate) fn fail(&mut self, id: RecordId, error: TaskError) -> Result<(), RecordError> {
        let record = self.pending_mut(id)?;
        record.status = StepStatus::Failure;
        record.error = Some(error);
        Ok(())
    }

    fn pending_mut(&mut self, id: RecordId) -> Result<&mut StepRecord<T>, RecordError> {
        let index = id.index();
        let record = self
            .records
            .get_mut(index)
            .ok_or(RecordError::Missing { index })?;
        if record.status.is_terminal() {
            return Err(RecordError::Finished {
                index,
                status: record.status,
            });
        }
        Ok(record)
    }

    /// Returns the record behind `id`, if this log holds it.
    pub fn get(&self, id: RecordId) -> Option<&StepRecord<T>> {
        self.records.get(id.index())
    }

    /// Returns the most recently opened record.
    pub fn last(&self) -> Option<&StepRecord<T>> {
        self.records.last()
    }

    /// Returns an iterator over the records in log order.
    pub fn iter(&self) -> std::slice::Iter<'_, StepRecord<T>> {
        self.records.iter()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record has been opened.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the error of every failed record, in log order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskError> {
        self.records
            .iter()
            .filter(|record| record.status == StepStatus::Failure)
            .filter_map(|record| record.error.as_ref())
    }
}

impl<T> Index<usize> for StepLog<T> {
    type Output = StepRecord<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

impl<'a, T> IntoIterator for &'a StepLog<T> {
    type Item = &'a StepRecord<T>;
    type IntoIter = std::slice::Iter<'a, StepRecord<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
