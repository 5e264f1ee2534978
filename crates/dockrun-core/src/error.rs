//! Core domain errors.

use thiserror::Error;

use crate::step::LifecycleState;

/// Core domain errors for dockrun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid lifecycle state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
