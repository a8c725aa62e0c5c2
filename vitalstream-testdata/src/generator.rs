// VitalStream Testdata - Pulse signal generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic camera intensity signal.
//!
//! A sinusoidal pulse at a fixed heart rate over a constant baseline, with
//! optional Gaussian noise. Seeded generators are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use vitalstream::Sample;

/// Pulse generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Frames per second.
    pub sample_rate: f64,
    /// Simulated heart rate.
    pub bpm: f64,
    /// Mean intensity.
    pub baseline: f64,
    /// Pulse amplitude.
    pub amplitude: f64,
    /// Standard deviation of added noise.
    pub noise_std: f64,
    /// Side-channel confidence attached to every sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_confidence: Option<f64>,
    /// Timestamp of the first sample.
    pub start_time_ms: u64,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            bpm: 72.0,
            baseline: 0.5,
            amplitude: 0.05,
            noise_std: 0.0,
            side_confidence: None,
            start_time_ms: 0,
            seed: None,
        }
    }
}

impl PulseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_side_confidence(mut self, confidence: f64) -> Self {
        self.side_confidence = Some(confidence);
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Generator configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("Heart rate must be positive, got {0}")]
    InvalidBpm(f64),

    #[error("Noise standard deviation must be non-negative, got {0}")]
    InvalidNoise(f64),
}

/// Stateful sample source.
#[derive(Debug)]
pub struct PulseGenerator {
    config: PulseConfig,
    noise: Normal<f64>,
    rng: StdRng,
    index: u64,
}

impl PulseGenerator {
    pub fn new(config: PulseConfig) -> Result<Self, GeneratorError> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(GeneratorError::InvalidSampleRate(config.sample_rate));
        }
        if !(config.bpm.is_finite() && config.bpm > 0.0) {
            return Err(GeneratorError::InvalidBpm(config.bpm));
        }
        if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
            return Err(GeneratorError::InvalidNoise(config.noise_std));
        }
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|_| GeneratorError::InvalidNoise(config.noise_std))?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            noise,
            rng,
            index: 0,
        })
    }

    /// Samples produced so far.
    pub fn position(&self) -> u64 {
        self.index
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Produce the next sample.
    pub fn next_sample(&mut self) -> Sample {
        let t = self.index as f64 / self.config.sample_rate;
        let phase = 2.0 * PI * self.config.bpm / 60.0 * t;
        let mut value = self.config.baseline + self.config.amplitude * phase.sin();
        if self.config.noise_std > 0.0 {
            value += self.noise.sample(&mut self.rng);
        }

        let timestamp_ms =
            self.config.start_time_ms + (t * 1000.0).round() as u64;
        self.index += 1;

        let sample = Sample::new(value, timestamp_ms);
        match self.config.side_confidence {
            Some(confidence) => sample.with_side_confidence(confidence),
            None => sample,
        }
    }

    /// Produce the next `n` samples.
    pub fn take_samples(&mut self, n: usize) -> Vec<Sample> {
        (0..n).map(|_| self.next_sample()).collect()
    }

    /// Sample indices of the pulse maxima in `[0, len)`.
    ///
    /// Useful as a synthetic `peak_list` consistent with the generated signal.
    pub fn peak_indices(&self, len: u64) -> Vec<u64> {
        let samples_per_beat = self.config.sample_rate * 60.0 / self.config.bpm;
        (0..)
            .map(|beat| ((beat as f64 + 0.25) * samples_per_beat).round() as u64)
            .take_while(|&idx| idx < len)
            .collect()
    }
}

impl Iterator for PulseGenerator {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        Some(self.next_sample())
    }
}
