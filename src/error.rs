//! Error types for VitalStream
//!
//! This module defines all error types used throughout the library.

use crate::types::LifecycleState;
use thiserror::Error;

/// Result type alias for VitalStream operations
pub type Result<T> = std::result::Result<T, VitalError>;

/// Main error type for VitalStream operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VitalError {
    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure reported by the analysis engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Operation requested in the wrong lifecycle state
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Errors raised while validating construction parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Buffer capacity must be strictly positive
    #[error("Buffer capacity must be greater than zero")]
    ZeroCapacity,

    /// Sample rate is zero, negative, or not finite
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// Tick interval must be strictly positive
    #[error("Flush interval must be greater than zero")]
    ZeroInterval,

    /// Display window must be strictly positive
    #[error("Display window size must be greater than zero")]
    ZeroDisplayWindow,

    /// Display window cannot be larger than the history it is cut from
    #[error("Display window of {window} samples exceeds buffer capacity {capacity}")]
    DisplayWindowExceedsCapacity { window: usize, capacity: usize },
}

/// Errors surfaced by the external analysis engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Engine refused to initialize
    #[error("Engine creation failed: {0}")]
    Create(String),

    /// Engine rejected a sample batch
    #[error("Push failed: {0}")]
    Push(String),

    /// Engine failed while producing a result
    #[error("Poll failed: {0}")]
    Poll(String),

    /// Handle used after `destroy()`
    #[error("Engine handle has been destroyed")]
    Destroyed,

    /// Configuration the engine cannot honour
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
}

/// Errors related to the orchestrator lifecycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    /// Operation not permitted in the current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
}
