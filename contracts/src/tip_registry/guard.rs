//! # Reentrancy Guard
//!
//! A value transfer hands control to the recipient, which may call straight
//! back into the registry before the outer call has returned. Balance-moving
//! entry points run inside [`ReentrancyGuard::enter`]; a second guarded call
//! arriving while the first still holds the lock is rejected with
//! [`RegistryError::ReentrantCall`], whether or not the ordering of the
//! outer call would have made it harmless.
//!
//! The lock is released on drop, so early returns and `?` cannot leave the
//! registry locked.

use std::cell::Cell;

use super::error::RegistryError;

/// Per-registry mutual-exclusion flag for balance-moving operations.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    /// Creates an unlocked guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a guarded operation is running.
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }

    /// Takes the lock for `operation`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ReentrantCall`] if the lock is already held.
    pub fn enter(&self, operation: &'static str) -> Result<ReentrancyLock<'_>, RegistryError> {
        if self.entered.replace(true) {
            return Err(RegistryError::ReentrantCall { operation });
        }
        Ok(ReentrancyLock { guard: self })
    }
}

/// Held for the duration of one guarded operation.
#[derive(Debug)]
pub struct ReentrancyLock<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for ReentrancyLock<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}
