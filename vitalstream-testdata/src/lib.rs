// VitalStream Testdata - Test signal and engine fixtures
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # VitalStream Testdata
//!
//! Fixtures for exercising the VitalStream orchestrator without a real
//! camera or analysis engine:
//!
//! - **Pulse generator**: seeded sinusoidal intensity samples at a chosen heart rate
//! - **Scripted engine**: an [`AnalysisEngine`](vitalstream::AnalysisEngine)
//!   whose poll results and failures are queued by the test
//!
//! ## Quick Start
//!
//! ```rust
//! use vitalstream_testdata::{EngineScript, PulseConfig, PulseGenerator};
//!
//! let mut gen = PulseGenerator::new(PulseConfig::new().with_bpm(72.0).with_seed(7)).unwrap();
//! let samples = gen.take_samples(90);
//! assert_eq!(samples.len(), 90);
//!
//! let script = EngineScript::new();
//! script.push_result(vitalstream_testdata::good_result(72.0, 0.8));
//! let _factory = script.factory();
//! ```

pub mod engine;
pub mod generator;

pub use engine::{EngineScript, ScriptedEngine, ScriptedEngineFactory};
pub use generator::{GeneratorError, PulseConfig, PulseGenerator};

use vitalstream::{RawEngineResult, RawQuality};

/// Result with good quality and a native confidence.
pub fn good_result(bpm: f64, confidence: f64) -> RawEngineResult {
    RawEngineResult {
        bpm,
        quality: RawQuality {
            good_quality: true,
            total_beats: 12,
            rejection_rate: 0.0,
            native_confidence: Some(confidence),
            native_snr_db: None,
        },
        ..Default::default()
    }
}

/// Result from an engine still in warm-up: no native metrics, poor quality.
pub fn warmup_result() -> RawEngineResult {
    RawEngineResult {
        quality: RawQuality {
            good_quality: false,
            total_beats: 0,
            rejection_rate: 1.0,
            native_confidence: Some(0.0),
            native_snr_db: None,
        },
        ..Default::default()
    }
}
