//! Configuration types for VitalStream

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Analysis settings forwarded verbatim to the engine on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lowest heart rate the engine should search for
    pub min_bpm: f64,
    /// Highest heart rate the engine should search for
    pub max_bpm: f64,
    /// Length of the engine's analysis window in seconds
    pub analysis_window_secs: f64,
    /// Compute heart-rate variability statistics
    pub hrv_enabled: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 180.0,
            analysis_window_secs: 10.0,
            hrv_enabled: true,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Nominal sample rate of the capture layer (Hz)
    pub sample_rate: f64,

    /// History buffer capacity, also the cap on the pending queue
    pub buffer_capacity: usize,

    /// Tick interval in milliseconds
    pub pending_flush_interval_ms: u64,

    /// Number of history samples shown on screen
    pub display_window_size: usize,

    /// Settings passed through to the engine
    pub analysis: AnalysisConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            buffer_capacity: 300, // 10 s at 30 Hz
            pending_flush_interval_ms: 500,
            display_window_size: 150,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Preset for a 30 fps camera
    pub fn camera_30fps() -> Self {
        Self::default()
    }

    /// Preset for a 60 fps camera
    pub fn camera_60fps() -> Self {
        Self {
            sample_rate: 60.0,
            buffer_capacity: 600,
            pending_flush_interval_ms: 250,
            display_window_size: 300,
            ..Default::default()
        }
    }

    /// Set the sample rate
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the history/pending capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the tick interval
    pub fn with_flush_interval_ms(mut self, interval_ms: u64) -> Self {
        self.pending_flush_interval_ms = interval_ms;
        self
    }

    /// Set the display window size
    pub fn with_display_window(mut self, window: usize) -> Self {
        self.display_window_size = window;
        self
    }

    /// Set the engine analysis settings
    pub fn with_analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// Check the configuration for values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.pending_flush_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.display_window_size == 0 {
            return Err(ConfigError::ZeroDisplayWindow);
        }
        if self.display_window_size > self.buffer_capacity {
            return Err(ConfigError::DisplayWindowExceedsCapacity {
                window: self.display_window_size,
                capacity: self.buffer_capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.sample_rate, 30.0);
        assert_eq!(config.buffer_capacity, 300);
        assert_eq!(config.display_window_size, 150);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let c60 = OrchestratorConfig::camera_60fps();
        assert_eq!(c60.sample_rate, 60.0);
        assert!(c60.validate().is_ok());
        assert_eq!(OrchestratorConfig::camera_30fps(), OrchestratorConfig::default());
    }

    #[test]
    fn test_invalid_sample_rate() {
        for rate in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let config = OrchestratorConfig::default().with_sample_rate(rate);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = OrchestratorConfig::default().with_buffer_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));

        let config = OrchestratorConfig::default().with_flush_interval_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let config = OrchestratorConfig::default().with_display_window(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDisplayWindow));
    }

    #[test]
    fn test_window_larger_than_capacity() {
        let config = OrchestratorConfig::default()
            .with_buffer_capacity(100)
            .with_display_window(150);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DisplayWindowExceedsCapacity {
                window: 150,
                capacity: 100
            })
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "sample_rate": 60.0, "analysis": { "hrv_enabled": false } }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 60.0);
        assert_eq!(config.buffer_capacity, 300);
        assert!(!config.analysis.hrv_enabled);
        assert_eq!(config.analysis.max_bpm, 180.0);
    }
}
