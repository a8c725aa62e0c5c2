//! Analysis engine contract.
//!
//! The numerical analysis (filtering, spectral estimation, beat detection,
//! HRV) lives outside this crate. The orchestrator only needs a narrow
//! push/poll surface, expressed by the two traits below. A factory creates
//! one engine handle per sensing session; the handle is destroyed on stop.

use crate::config::AnalysisConfig;
use crate::error::EngineError;
use crate::types::RawEngineResult;
use async_trait::async_trait;

/// Creates engine handles.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Engine handle type produced by this factory
    type Engine: AnalysisEngine;

    /// Initialize an engine for the given sample rate.
    ///
    /// Fails with [`EngineError`] on an invalid sample rate or an
    /// unsupported configuration.
    async fn create(
        &self,
        sample_rate: f64,
        config: &AnalysisConfig,
    ) -> Result<Self::Engine, EngineError>;
}

/// A live engine handle.
#[async_trait]
pub trait AnalysisEngine: Send + 'static {
    /// Append a batch of samples, oldest first.
    async fn push(&mut self, samples: &[f64]) -> Result<(), EngineError>;

    /// Most recent result computed since the last poll, if any.
    async fn poll(&mut self) -> Result<Option<RawEngineResult>, EngineError>;

    /// Release engine-side resources. Must be idempotent.
    async fn destroy(&mut self) -> Result<(), EngineError>;
}
