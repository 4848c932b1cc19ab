use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use super::error::{ConfigError, ResolutionError};

/// Plugin and resolver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Initialized = 1,
    Destroyed = 2,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Destroyed => "destroyed",
        })
    }
}

/// Lifecycle state that can be observed and destroyed through a shared
/// reference.
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self(AtomicU8::new(LifecycleState::Uninitialized as u8))
    }
}

impl Lifecycle {
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self.0.load(Ordering::Acquire) {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Initialized,
            _ => LifecycleState::Destroyed,
        }
    }

    /// Configuration may change only before initialization.
    pub(crate) fn ensure_configurable(&self, plugin_id: &str) -> Result<(), ConfigError> {
        match self.state() {
            LifecycleState::Uninitialized => Ok(()),
            state => Err(ConfigError::InvalidState {
                plugin_id: plugin_id.to_owned(),
                state,
            }),
        }
    }

    pub(crate) fn ensure_initialized(&self, plugin_id: &str) -> Result<(), ResolutionError> {
        match self.state() {
            LifecycleState::Initialized => Ok(()),
            state => Err(ResolutionError::InvalidState {
                plugin_id: plugin_id.to_owned(),
                state,
            }),
        }
    }

    /// Uninitialized -> Initialized. Any other transition is rejected.
    pub(crate) fn mark_initialized(&self, plugin_id: &str) -> Result<(), ConfigError> {
        self.0
            .compare_exchange(
                LifecycleState::Uninitialized as u8,
                LifecycleState::Initialized as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| ConfigError::InvalidState {
                plugin_id: plugin_id.to_owned(),
                state: self.state(),
            })
    }

    /// Initialized -> Uninitialized, undoing a partially applied
    /// initialization. Other states are left alone.
    pub(crate) fn roll_back(&self) {
        let _ = self.0.compare_exchange(
            LifecycleState::Initialized as u8,
            LifecycleState::Uninitialized as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Terminal; idempotent.
    pub(crate) fn destroy(&self) {
        self.0
            .store(LifecycleState::Destroyed as u8, Ordering::Release);
    }
}
