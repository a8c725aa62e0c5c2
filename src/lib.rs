//! # VitalStream - Streaming orchestration for camera-based vital signs
//!
//! Sits between a capture layer producing one intensity sample per frame and
//! an external heart-rate analysis engine.
//!
//! ## Key Features
//!
//! - **Bounded buffering**: circular history plus a capped pending queue
//! - **Periodic flush**: a fixed-interval tick pushes samples and polls results
//! - **Fallback metrics**: confidence and SNR are always defined, with the
//!   source of each value recorded
//! - **Display-ready peaks**: engine peak indices remapped into the visible window
//!
//! ## Quick Start
//!
//! ```rust
//! use vitalstream::{FallbackMetricsDeriver, DerivationContext, RawEngineResult, RawQuality};
//! use vitalstream::{ConfidenceSource, SignalQuality};
//!
//! let raw = RawEngineResult {
//!     bpm: 72.0,
//!     quality: RawQuality {
//!         good_quality: true,
//!         total_beats: 12,
//!         native_confidence: Some(0.8),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let snapshot = FallbackMetricsDeriver::new().derive(&raw, &DerivationContext::default());
//! assert_eq!(snapshot.sources.confidence, ConfidenceSource::Native);
//! assert_eq!(snapshot.quality.signal_quality, SignalQuality::Good);
//! ```
//!
//! ## Modules
//!
//! - [`history`]: Fixed-capacity circular history
//! - [`types`]: Samples, engine results and snapshots
//! - [`derive`]: Confidence/SNR fallback chains, signal classification, peak remapping
//! - [`config`]: Orchestrator and engine settings
//! - [`engine`]: Analysis engine contract (`runtime` feature)
//! - [`orchestrator`]: Lifecycle, buffering and tick loop (`runtime` feature)

// Modules
pub mod config;
pub mod derive;
pub mod error;
pub mod history;
pub mod types;

#[cfg(feature = "runtime")]
pub mod engine;
#[cfg(feature = "runtime")]
pub mod orchestrator;

// Re-exports for convenient access
pub use config::{AnalysisConfig, OrchestratorConfig};
pub use derive::{
    classify_signal, derive_confidence, derive_snr, remap_peaks, spectral_snr_db, tail_snr_db,
    DerivationContext, FallbackMetricsDeriver, MIN_TAIL_SAMPLES, SNR_FLOOR_DB,
};
pub use error::{ConfigError, EngineError, LifecycleError, Result, VitalError};
pub use history::HistoryBuffer;
pub use types::{
    ConfidenceSource, DerivationSources, LifecycleState, MetricsSnapshot, RawEngineResult,
    RawQuality, Sample, SignalQuality, SnapshotQuality, SnrSource,
};

#[cfg(feature = "runtime")]
pub use engine::{AnalysisEngine, EngineFactory};
#[cfg(feature = "runtime")]
pub use orchestrator::{EventReceiver, OrchestratorEvent, OrchestratorStats, StreamingOrchestrator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports_compose() {
        let mut history = HistoryBuffer::new(4).unwrap();
        for v in [1.0, 2.0, 3.0] {
            history.push(v);
        }
        let tail = history.get_all();
        let ctx = DerivationContext {
            history_tail: Some(&tail),
            ..Default::default()
        };
        let snapshot = FallbackMetricsDeriver::new().derive(&RawEngineResult::default(), &ctx);
        // Too few samples for the tail estimate.
        assert_eq!(snapshot.sources.snr, SnrSource::Floor);
        assert_eq!(snapshot.snr_db, SNR_FLOOR_DB);
    }
}
