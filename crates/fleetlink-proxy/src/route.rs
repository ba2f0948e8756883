//! The default-route slot read by the host's reconnect hook.

use std::sync::{PoisonError, RwLock};

/// Name of the backend that arriving players are sent to.
///
/// Written by the router on the link task, read by the host on whatever
/// thread handles player logins.
#[derive(Debug, Default)]
pub struct DefaultRoute {
    slot: RwLock<Option<String>>,
}

impl DefaultRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current default backend, if one was ever set.
    pub fn get(&self) -> Option<String> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the slot, returning the previous value.
    pub fn set(&self, name: impl Into<String>) -> Option<String> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(name.into())
    }
}
