//! Storage port: a local durable key-value slot.

use std::sync::Arc;

use homedash_domain::error::HomeDashError;

/// Durable string slots addressed by a fixed key.
///
/// Calls are synchronous: the store writes through on every applied
/// command before notifying observers.
pub trait StateStorage: Send + Sync {
    /// Read the slot, `None` when it has never been written.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Storage`] when the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, HomeDashError>;

    /// Replace the slot content.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Storage`] when the backend cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), HomeDashError>;
}

impl<T: StateStorage + ?Sized> StateStorage for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<String>, HomeDashError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), HomeDashError> {
        (**self).save(key, value)
    }
}

impl<T: StateStorage + ?Sized> StateStorage for &T {
    fn load(&self, key: &str) -> Result<Option<String>, HomeDashError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), HomeDashError> {
        (**self).save(key, value)
    }
}
