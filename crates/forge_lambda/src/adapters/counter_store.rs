use thiserror::Error;

/// A named counter: the stored expression plus the store-assigned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterEntry {
    pub name: String,
    pub expression: String,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterStoreError {
    #[error("sequence '{0}' has not been initialized")]
    NotFound(String),
    #[error("counter store request failed: {0}")]
    Backend(String),
}

/// Durable counter storage. `put` must allocate a strictly greater version on
/// every call, atomically; callers never compute versions themselves.
pub trait CounterStore {
    fn get(&self, name: &str) -> Result<CounterEntry, CounterStoreError>;

    fn put(&self, name: &str, expression: &str, description: &str)
        -> Result<i64, CounterStoreError>;
}
