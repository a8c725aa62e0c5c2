//! Shared data types
//!
//! Samples flowing in from the capture layer, raw results flowing back from
//! the analysis engine, and the fully populated [`MetricsSnapshot`] handed to
//! subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single optical sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Extracted sensor value (e.g. mean red-channel intensity)
    pub value: f64,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Side-channel confidence estimate in [0, 1], if the capture layer has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_confidence: Option<f64>,
}

impl Sample {
    /// Create a sample without side-channel confidence
    pub fn new(value: f64, timestamp_ms: u64) -> Self {
        Self {
            value,
            timestamp_ms,
            side_confidence: None,
        }
    }

    /// Attach a side-channel confidence estimate
    pub fn with_side_confidence(mut self, confidence: f64) -> Self {
        self.side_confidence = Some(confidence);
        self
    }
}

/// Quality block of a raw engine result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuality {
    pub good_quality: bool,
    pub total_beats: u32,
    /// Fraction of rejected beats in [0, 1]
    pub rejection_rate: f64,
    /// Engine's own confidence; `Some(0.0)` means warm-up, not "unknown"
    #[serde(default)]
    pub native_confidence: Option<f64>,
    #[serde(default)]
    pub native_snr_db: Option<f64>,
}

/// Raw result as returned by [`AnalysisEngine::poll`](crate::engine::AnalysisEngine::poll).
///
/// Any field may be missing or partially meaningful; the deriver decides what
/// to trust.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEngineResult {
    pub bpm: f64,
    /// High-frequency band power
    pub hf: f64,
    /// Low-frequency band power
    pub lf: f64,
    pub total_power: f64,
    /// Beat peaks as absolute indices into the engine's cumulative sample count
    #[serde(default)]
    pub peak_list: Vec<u64>,
    pub quality: RawQuality,
}

/// Coarse signal classification shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    Good,
    Poor,
    Unknown,
}

impl SignalQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Poor => "poor",
            Self::Unknown => "unknown",
        }
    }
}

/// Which tier of the confidence ladder produced the snapshot confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Engine-reported confidence used as is
    Native,
    /// Engine in warm-up; raised from the side-channel estimate
    WarmupBoosted,
    /// Side-channel estimate used directly
    SideChannel,
    /// Synthesized from the quality flags
    Synthetic,
}

/// Which tier of the SNR ladder produced the snapshot SNR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnrSource {
    Native,
    SpectralBands,
    HistoryTail,
    Floor,
}

/// Provenance of the derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationSources {
    pub confidence: ConfidenceSource,
    pub snr: SnrSource,
}

/// Quality block of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotQuality {
    pub good_quality: bool,
    pub signal_quality: SignalQuality,
    pub total_beats: u32,
}

/// Fully populated metrics for live display.
///
/// Created fresh on every tick that yields a result; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub bpm: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub snr_db: f64,
    /// Peaks relative to the start of the displayed history window
    pub peak_list: Vec<usize>,
    pub quality: SnapshotQuality,
    pub sources: DerivationSources,
}

impl MetricsSnapshot {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Sensing/analysis lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

impl LifecycleState {
    /// Whether samples are accepted and ticks run.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}
