//! Fallback metrics derivation.
//!
//! Turns a partially populated [`RawEngineResult`] into a complete
//! [`MetricsSnapshot`]. Confidence and SNR each go through an ordered ladder
//! of sources; the first applicable tier wins and is recorded in
//! [`DerivationSources`] so callers (and tests) can see which one fired.
//!
//! Peak positions are remapped from the engine's absolute sample count into
//! indices valid against the currently displayed history window.

use crate::types::{
    ConfidenceSource, DerivationSources, MetricsSnapshot, RawEngineResult, RawQuality,
    SignalQuality, SnapshotQuality, SnrSource,
};

/// SNR reported when no better estimate is available (dB).
pub const SNR_FLOOR_DB: f64 = -10.0;

/// Minimum history tail length for the time-domain SNR estimate.
pub const MIN_TAIL_SAMPLES: usize = 16;

/// Side confidence above which it can lift a warm-up native confidence.
const WARMUP_SIDE_THRESHOLD: f64 = 0.05;

/// Side confidence above which it is trusted on its own.
const SIDE_CHANNEL_THRESHOLD: f64 = 0.1;

const GOOD_CONFIDENCE: f64 = 0.35;
const POOR_CONFIDENCE: f64 = 0.15;
const POOR_SNR_DB: f64 = -8.0;

/// Auxiliary inputs to a derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivationContext<'a> {
    /// Side-channel confidence from the capture layer
    pub side_confidence: Option<f64>,
    /// Most recent raw sample values, oldest first
    pub history_tail: Option<&'a [f64]>,
    /// Samples the engine has received so far
    pub buffer_length: u64,
    /// Size of the displayed history window
    pub window_size: usize,
}

/// Pure derivation of a display snapshot from a raw engine result.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMetricsDeriver;

impl FallbackMetricsDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Derive a complete snapshot.
    pub fn derive(&self, raw: &RawEngineResult, ctx: &DerivationContext<'_>) -> MetricsSnapshot {
        let (confidence, confidence_source) = derive_confidence(&raw.quality, ctx.side_confidence);
        let (snr_db, snr_source) = derive_snr(raw, ctx.history_tail);
        let signal_quality = classify_signal(raw.quality.good_quality, confidence, snr_db);
        let peak_list = remap_peaks(&raw.peak_list, ctx.buffer_length, ctx.window_size);

        MetricsSnapshot {
            bpm: raw.bpm,
            confidence,
            snr_db,
            peak_list,
            quality: SnapshotQuality {
                good_quality: raw.quality.good_quality,
                signal_quality,
                total_beats: raw.quality.total_beats,
            },
            sources: DerivationSources {
                confidence: confidence_source,
                snr: snr_source,
            },
        }
    }
}

/// Confidence ladder.
///
/// 1. Native confidence if reported (0 means warm-up and may be lifted by
///    the side channel).
/// 2. Side-channel confidence above 0.1.
/// 3. Synthesized from the quality flags.
pub fn derive_confidence(
    quality: &RawQuality,
    side_confidence: Option<f64>,
) -> (f64, ConfidenceSource) {
    let side = side_confidence.filter(|c| c.is_finite());

    if let Some(native) = quality.native_confidence.filter(|c| c.is_finite()) {
        if native <= 0.0 {
            if let Some(side) = side.filter(|&s| s > WARMUP_SIDE_THRESHOLD) {
                return (
                    clamp_unit(native.max(side * 0.5)),
                    ConfidenceSource::WarmupBoosted,
                );
            }
        }
        return (clamp_unit(native), ConfidenceSource::Native);
    }

    if let Some(side) = side.filter(|&s| s > SIDE_CHANNEL_THRESHOLD) {
        return (clamp_unit(side), ConfidenceSource::SideChannel);
    }

    let retained = 1.0 - quality.rejection_rate;
    let synthetic = if quality.good_quality {
        retained.max(0.7)
    } else {
        retained.min(0.3)
    };
    (clamp_unit(synthetic), ConfidenceSource::Synthetic)
}

/// SNR ladder.
///
/// 1. Native SNR if reported and positive.
/// 2. Spectral band ratio when the engine reports good quality.
/// 3. Time-domain estimate over the history tail.
/// 4. [`SNR_FLOOR_DB`].
pub fn derive_snr(raw: &RawEngineResult, history_tail: Option<&[f64]>) -> (f64, SnrSource) {
    if let Some(native) = raw.quality.native_snr_db {
        if native.is_finite() && native > 0.0 {
            return (native, SnrSource::Native);
        }
    }

    if raw.quality.good_quality {
        if let Some(snr) = spectral_snr_db(raw.hf, raw.lf, raw.total_power) {
            return (snr, SnrSource::SpectralBands);
        }
    }

    if let Some(snr) = history_tail.and_then(tail_snr_db) {
        return (snr, SnrSource::HistoryTail);
    }

    (SNR_FLOOR_DB, SnrSource::Floor)
}

/// In-band vs out-of-band power ratio in dB.
///
/// `None` unless total power is positive, both bands are finite and the
/// result itself is finite.
pub fn spectral_snr_db(hf: f64, lf: f64, total_power: f64) -> Option<f64> {
    if !(total_power > 0.0 && hf.is_finite() && lf.is_finite()) {
        return None;
    }
    let signal = (hf + lf).max(0.01);
    let noise = (total_power - hf - lf).max(0.01);
    let snr = 10.0 * (signal / noise).log10();
    snr.is_finite().then_some(snr)
}

/// Time-domain SNR estimate over raw samples.
///
/// Half the peak-to-peak amplitude over the bounded RMS, in dB. Windows
/// shorter than [`MIN_TAIL_SAMPLES`] yield `None`.
pub fn tail_snr_db(window: &[f64]) -> Option<f64> {
    if window.len() < MIN_TAIL_SAMPLES {
        return None;
    }

    let (min, max) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let half_range = (max - min) / 2.0;
    let rms = (window.iter().map(|x| x * x).sum::<f64>() / window.len() as f64).sqrt();
    if !(half_range.is_finite() && rms.is_finite()) {
        return None;
    }
    let noise_rms = rms.min(half_range).max(1e-6);
    let snr = half_range / noise_rms;
    let db = 20.0 * snr.max(1e-6).log10();

    db.is_finite().then_some(db)
}

/// Classify the signal for display.
pub fn classify_signal(good_quality: bool, confidence: f64, snr_db: f64) -> SignalQuality {
    if good_quality && confidence >= GOOD_CONFIDENCE {
        SignalQuality::Good
    } else if confidence < POOR_CONFIDENCE || snr_db < POOR_SNR_DB {
        SignalQuality::Poor
    } else {
        SignalQuality::Unknown
    }
}

/// Map engine-absolute peak indices into the display window.
///
/// The window covers `[buffer_length - window_size, buffer_length)`; peaks
/// outside it are dropped and order is preserved.
pub fn remap_peaks(peaks: &[u64], buffer_length: u64, window_size: usize) -> Vec<usize> {
    let window_start = buffer_length.saturating_sub(window_size as u64);
    peaks
        .iter()
        .filter(|&&p| p >= window_start && p < buffer_length)
        .map(|&p| (p - window_start) as usize)
        .collect()
}

fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
