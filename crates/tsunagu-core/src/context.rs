//! Run context: application data plus the step log.

use crate::error::{RecordError, TaskError};
use crate::record::{RecordId, StepLog};
use crate::step::StepName;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Type-safe context key wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey(String);

impl ContextKey {
    /// Creates a new ContextKey.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContextKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for ContextKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Application-defined fields carried through a run.
///
/// Stores any `Send + Sync` type, retrieved by downcasting.
///
/// # Examples
///
/// ```
/// use tsunagu_core::ContextData;
///
/// let mut data = ContextData::new();
/// data.insert("user_id", 123u64);
/// data.insert("name", "Alice".to_string());
///
/// assert_eq!(data.get::<u64>("user_id"), Some(&123));
/// assert_eq!(data.get::<String>("name"), Some(&"Alice".to_string()));
///
/// // Wrong type returns None
/// assert_eq!(data.get::<String>("user_id"), None);
/// ```
#[derive(Default)]
pub struct ContextData {
    values: HashMap<ContextKey, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextData")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ContextData {
    /// Creates empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value with the given key.
    ///
    /// If the key already exists, the previous value is replaced.
    pub fn insert<V: Any + Send + Sync>(&mut self, key: impl Into<ContextKey>, value: V) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<V: Any + Send + Sync>(mut self, key: impl Into<ContextKey>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.values.get(key).and_then(|v| v.downcast_ref::<V>())
    }

    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get_mut<V: Any>(&mut self, key: &str) -> Option<&mut V> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<V>())
    }

    /// Removes a value by key and returns it.
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn remove<V: Any>(&mut self, key: &str) -> Option<V> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<V>().ok())
            .map(|b| *b)
    }

    /// Returns `true` if the key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &ContextKey> {
        self.values.keys()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Shared record of a single run.
///
/// Holds the caller's [`ContextData`] and the [`StepLog`] every task of the
/// run appends to. One context belongs to one run: task and pipeline runs
/// borrow it mutably, so it can't be shared by two runs at once.
///
/// # Examples
///
/// ```
/// use tsunagu_core::Context;
///
/// let mut ctx: Context<String> = Context::new();
/// ctx.insert("tenant", "acme".to_string());
///
/// assert_eq!(ctx.get::<String>("tenant").map(|s| s.as_str()), Some("acme"));
/// assert!(ctx.steps().is_empty());
/// ```
pub struct Context<T> {
    data: ContextData,
    steps: StepLog<T>,
    started_at: Instant,
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("steps", &self.steps.len())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl<T> Default for Context<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Context<T> {
    /// Creates a context with no data and an empty step log.
    pub fn new() -> Self {
        Self::with_data(ContextData::new())
    }

    /// Creates a context around the caller's data with an empty step log.
    pub fn with_data(data: ContextData) -> Self {
        Self {
            data,
            steps: StepLog::new(),
            started_at: Instant::now(),
        }
    }

    /// Returns the step log.
    pub fn steps(&self) -> &StepLog<T> {
        &self.steps
    }

    /// Appends one pending record per step name and returns their handles.
    ///
    /// Runners open every record of a run before its first step executes.
    pub fn open_records<I>(&mut self, names: I) -> Vec<RecordId>
    where
        I: IntoIterator<Item = StepName>,
    {
        self.steps.open(names)
    }

    /// Stores the input of a pending record.
    pub fn begin_record(&mut self, id: RecordId, input: T) -> Result<(), RecordError> {
        self.steps.begin(id, input)
    }

    /// Marks a pending record as successful.
    pub fn succeed_record(&mut self, id: RecordId, output: T) -> Result<(), RecordError> {
        self.steps.succeed(id, output)
    }

    /// Marks a pending record as failed.
    pub fn fail_record(&mut self, id: RecordId, error: TaskError) -> Result<(), RecordError> {
        self.steps.fail(id, error)
    }

    /// Returns the application data.
    pub fn data(&self) -> &ContextData {
        &self.data
    }

    /// Returns the application data mutably.
    pub fn data_mut(&mut self) -> &mut ContextData {
        &mut self.data
    }

    /// Inserts a value with the given key.
    ///
    /// If the key already exists, the previous value is replaced.
    pub fn insert<V: Any + Send + Sync>(&mut self, key: impl Into<ContextKey>, value: V) {
        self.data.insert(key, value);
    }

    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.data.get(key)
    }

    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get_mut<V: Any>(&mut self, key: &str) -> Option<&mut V> {
        self.data.get_mut(key)
    }

    /// Removes a value by key and returns it.
    pub fn remove<V: Any>(&mut self, key: &str) -> Option<V> {
        self.data.remove(key)
    }

    /// Returns `true` if the key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Removes all data entries. The step log is left untouched.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the time elapsed since the context was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Splits the context into its data and its finished step log.
    pub fn into_parts(self) -> (ContextData, StepLog<T>) {
        (self.data, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StepStatus;

    #[test]
    fn test_heterogeneous_storage() {
        let mut ctx = Context::<String>::new();

        ctx.insert("int", 42i32);
        ctx.insert("string", "hello".to_string());
        ctx.insert("bool", true);

        assert_eq!(ctx.get::<i32>("int"), Some(&42));
        assert_eq!(ctx.get::<String>("string"), Some(&"hello".to_string()));
        assert_eq!(ctx.get::<bool>("bool"), Some(&true));

        // Wrong type returns None
        assert_eq!(ctx.get::<String>("int"), None);
    }

    #[test]
    fn test_get_mut() {
        let mut ctx = Context::<String>::new();
        ctx.insert("count", 0i32);

        if let Some(count) = ctx.get_mut::<i32>("count") {
            *count += 1;
        }

        assert_eq!(ctx.get::<i32>("count"), Some(&1));
    }

    #[test]
    fn test_remove() {
        let mut data = ContextData::new().with("key", "value".to_string());

        let removed = data.remove::<String>("key");
        assert_eq!(removed, Some("value".to_string()));
        assert!(!data.contains_key("key"));
    }

    #[test]
    fn test_with_data_keeps_caller_fields() {
        let data = ContextData::new().with("region", "eu".to_string());
        let ctx = Context::<u8>::with_data(data);

        assert_eq!(ctx.get::<String>("region"), Some(&"eu".to_string()));
        assert!(ctx.steps().is_empty());
    }

    #[test]
    fn test_clear_keeps_step_log() {
        let mut ctx = Context::<u8>::new();
        ctx.insert("key", 1u8);
        ctx.open_records([StepName::new("a")]);

        ctx.clear();

        assert!(ctx.data().is_empty());
        assert_eq!(ctx.steps().len(), 1);
    }

    #[test]
    fn test_records_are_updated_through_context() {
        let mut ctx = Context::<u8>::new();
        let ids = ctx.open_records([StepName::new("a"), StepName::new("b")]);

        assert!(ctx.begin_record(ids[0], 1).is_ok());
        assert!(ctx.succeed_record(ids[0], 2).is_ok());

        let statuses: Vec<_> = ctx.steps().iter().map(|r| r.status()).collect();
        assert_eq!(statuses, vec![StepStatus::Success, StepStatus::Pending]);

        // A handle from another context doesn't reach into this one.
        let mut fresh = Context::<u8>::new();
        assert_eq!(
            fresh.succeed_record(ids[1], 3),
            Err(RecordError::Missing { index: 1 })
        );
    }

    #[test]
    fn test_context_key() {
        let key1 = ContextKey::new("test");
        let key2: ContextKey = "test".into();
        assert_eq!(key1, key2);
    }
}
