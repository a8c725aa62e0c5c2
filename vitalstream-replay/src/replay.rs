// VitalStream Replay - Recorded session replay
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Replays a recorded capture session through the orchestrator.
//!
//! Two inputs are needed:
//!
//! - a samples CSV with columns `timestamp_ms,value[,side_confidence]`
//! - a results JSONL file, one `{ "at_sample": n, "result": {...} }` per line
//!
//! The recorded engine releases a result once it has received `at_sample`
//! samples, so snapshots come out of the real buffering and tick path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use vitalstream::{
    AnalysisConfig, AnalysisEngine, ConfigError, EngineError, EngineFactory, LifecycleState,
    MetricsSnapshot, OrchestratorConfig, OrchestratorEvent, OrchestratorStats, RawEngineResult,
    Sample, StreamingOrchestrator, VitalError,
};

/// Configuration for a replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Samples CSV.
    pub samples_path: PathBuf,
    /// Engine results JSONL.
    pub results_path: PathBuf,
    /// Replay speed multiplier (1.0 = real-time).
    pub speed: f64,
    /// Orchestrator settings.
    pub orchestrator: OrchestratorConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            samples_path: PathBuf::new(),
            results_path: PathBuf::new(),
            speed: 1.0,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    timestamp_ms: u64,
    value: f64,
    #[serde(default)]
    side_confidence: Option<f64>,
}

/// One recorded engine result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResult {
    /// Engine-side sample count at which the result became available.
    pub at_sample: u64,
    pub result: RawEngineResult,
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub samples: usize,
    pub snapshots: usize,
    pub engine_failures: usize,
    pub final_state: LifecycleState,
    pub stats: OrchestratorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<MetricsSnapshot>,
}

/// Parse a samples CSV.
pub fn load_samples(path: &Path) -> Result<Vec<Sample>, ReplayError> {
    if !path.exists() {
        return Err(ReplayError::FileNotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let names: Vec<&str> = headers.iter().map(str::trim).collect();
    if names.first() != Some(&"timestamp_ms") || names.get(1) != Some(&"value") {
        return Err(ReplayError::InvalidFormat(
            "Columns must start with 'timestamp_ms,value'".to_string(),
        ));
    }

    let mut samples = Vec::new();
    for row in reader.deserialize() {
        let row: SampleRow = row?;
        let sample = Sample::new(row.value, row.timestamp_ms);
        samples.push(match row.side_confidence {
            Some(confidence) => sample.with_side_confidence(confidence),
            None => sample,
        });
    }

    if samples.is_empty() {
        return Err(ReplayError::EmptyDataset);
    }
    Ok(samples)
}

/// Parse a results JSONL file. Blank lines are skipped.
pub fn load_results(path: &Path) -> Result<Vec<RecordedResult>, ReplayError> {
    if !path.exists() {
        return Err(ReplayError::FileNotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;

    let mut results: Vec<RecordedResult> = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: RecordedResult =
            serde_json::from_str(line).map_err(|source| ReplayError::Json {
                line: idx + 1,
                source,
            })?;
        if let Some(prev) = results.last() {
            if record.at_sample < prev.at_sample {
                return Err(ReplayError::InvalidFormat(format!(
                    "Line {}: at_sample {} goes backwards (previous {})",
                    idx + 1,
                    record.at_sample,
                    prev.at_sample
                )));
            }
        }
        results.push(record);
    }
    Ok(results)
}

/// Factory for [`RecordedEngine`].
#[derive(Debug, Clone)]
pub struct RecordedEngineFactory {
    results: Arc<Vec<RecordedResult>>,
}

impl RecordedEngineFactory {
    pub fn new(results: Vec<RecordedResult>) -> Self {
        Self {
            results: Arc::new(results),
        }
    }
}

#[async_trait]
impl EngineFactory for RecordedEngineFactory {
    type Engine = RecordedEngine;

    async fn create(
        &self,
        sample_rate: f64,
        config: &AnalysisConfig,
    ) -> Result<RecordedEngine, EngineError> {
        debug!(
            "Recorded engine created: {} Hz, {}-{} bpm",
            sample_rate, config.min_bpm, config.max_bpm
        );
        Ok(RecordedEngine {
            pending: self.results.iter().cloned().collect(),
            received: 0,
            destroyed: false,
        })
    }
}

/// Engine that hands back recorded results as samples arrive.
#[derive(Debug)]
pub struct RecordedEngine {
    pending: VecDeque<RecordedResult>,
    received: u64,
    destroyed: bool,
}

#[async_trait]
impl AnalysisEngine for RecordedEngine {
    async fn push(&mut self, samples: &[f64]) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        self.received += samples.len() as u64;
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<RawEngineResult>, EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        // Only the newest of the results that became due is reported.
        let mut latest = None;
        while self
            .pending
            .front()
            .map_or(false, |r| r.at_sample <= self.received)
        {
            latest = self.pending.pop_front().map(|r| r.result);
        }
        Ok(latest)
    }

    async fn destroy(&mut self) -> Result<(), EngineError> {
        self.destroyed = true;
        self.pending.clear();
        Ok(())
    }
}

/// Replay the recorded session, writing every snapshot as a JSON line to `out`.
pub async fn run<W: Write>(config: &ReplayConfig, out: &mut W) -> Result<ReplaySummary, ReplayError> {
    if !(config.speed.is_finite() && config.speed > 0.0) {
        return Err(ReplayError::InvalidFormat(format!(
            "Speed must be positive, got {}",
            config.speed
        )));
    }
    let samples = load_samples(&config.samples_path)?;
    let results = load_results(&config.results_path)?;
    info!(
        "Loaded {} samples, {} recorded results",
        samples.len(),
        results.len()
    );

    let (mut orchestrator, mut events) =
        StreamingOrchestrator::new(config.orchestrator.clone(), RecordedEngineFactory::new(results))?;
    orchestrator.start().await?;

    let mut summary = ReplaySummary {
        samples: samples.len(),
        snapshots: 0,
        engine_failures: 0,
        final_state: LifecycleState::Idle,
        stats: OrchestratorStats::default(),
        last_snapshot: None,
    };

    let mut previous_ts = samples.first().map(|s| s.timestamp_ms).unwrap_or(0);
    for sample in samples {
        let gap = sample.timestamp_ms.saturating_sub(previous_ts);
        previous_ts = sample.timestamp_ms;
        if gap > 0 {
            sleep(Duration::from_secs_f64(gap as f64 / 1000.0 / config.speed)).await;
        }
        orchestrator.add_sample(sample);
        drain_events(&mut events, &mut summary, out)?;
    }

    // Flush what the timer has not picked up yet.
    orchestrator.tick().await;
    drain_events(&mut events, &mut summary, out)?;

    summary.stats = orchestrator.stats();
    summary.last_snapshot = orchestrator.latest_snapshot();
    orchestrator.stop().await;
    drain_events(&mut events, &mut summary, out)?;
    summary.final_state = orchestrator.state();

    info!(
        "Replay done: {} snapshots from {} samples",
        summary.snapshots, summary.samples
    );
    Ok(summary)
}

fn drain_events<W: Write>(
    events: &mut vitalstream::EventReceiver,
    summary: &mut ReplaySummary,
    out: &mut W,
) -> Result<(), ReplayError> {
    while let Ok(event) = events.try_recv() {
        match event {
            OrchestratorEvent::Metrics { snapshot, .. } => {
                summary.snapshots += 1;
                writeln!(out, "{}", snapshot.to_json()?)?;
            }
            OrchestratorEvent::StateChanged(state) => info!("State: {}", state),
            OrchestratorEvent::EngineFailed(err) => {
                summary.engine_failures += 1;
                warn!("Engine failed: {}", err);
            }
        }
    }
    Ok(())
}

/// Errors that can occur during replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Orchestrator(#[from] VitalError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_samples_csv(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp_ms,value,side_confidence").unwrap();
        for i in 0..rows {
            let side = if i % 2 == 0 { "0.4" } else { "" };
            writeln!(file, "{},{},{}", i * 33, 0.5 + (i % 5) as f64 * 0.01, side).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn create_results_jsonl(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    const GOOD_AT_30: &str = r#"{"at_sample":30,"result":{"bpm":72.0,"hf":0.0,"lf":0.0,"total_power":0.0,"peak_list":[10,25],"quality":{"good_quality":true,"total_beats":3,"rejection_rate":0.0,"native_confidence":0.8,"native_snr_db":null}}}"#;

    #[test]
    fn test_load_samples() {
        let file = create_samples_csv(3);
        let samples = load_samples(file.path()).expect("Failed to parse CSV");

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].timestamp_ms, 33);
        assert_eq!(samples[0].side_confidence, Some(0.4));
        assert_eq!(samples[1].side_confidence, None);
    }

    #[test]
    fn test_load_samples_without_side_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp_ms,value").unwrap();
        writeln!(file, "0,0.5").unwrap();
        file.flush().unwrap();

        let samples = load_samples(file.path()).unwrap();
        assert_eq!(samples, vec![Sample::new(0.5, 0)]);
    }

    #[test]
    fn test_load_samples_bad_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,intensity").unwrap();
        writeln!(file, "0,0.5").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_samples(file.path()),
            Err(ReplayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_load_samples_missing_file() {
        assert!(matches!(
            load_samples(Path::new("/nonexistent/samples.csv")),
            Err(ReplayError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_results() {
        let file = create_results_jsonl(&[GOOD_AT_30, "", GOOD_AT_30]);
        let results = load_results(file.path()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].at_sample, 30);
        assert_eq!(results[0].result.quality.native_confidence, Some(0.8));
    }

    #[test]
    fn test_load_results_reports_line() {
        let file = create_results_jsonl(&[GOOD_AT_30, "{not json"]);
        match load_results(file.path()) {
            Err(ReplayError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recorded_engine_releases_by_sample_count() {
        let factory = RecordedEngineFactory::new(vec![
            RecordedResult {
                at_sample: 5,
                result: RawEngineResult {
                    bpm: 60.0,
                    ..Default::default()
                },
            },
            RecordedResult {
                at_sample: 8,
                result: RawEngineResult {
                    bpm: 65.0,
                    ..Default::default()
                },
            },
        ]);
        let mut engine = factory
            .create(30.0, &AnalysisConfig::default())
            .await
            .unwrap();

        engine.push(&[0.0; 4]).await.unwrap();
        assert_eq!(engine.poll().await.unwrap(), None);

        engine.push(&[0.0; 6]).await.unwrap();
        // Both are due; only the newest is reported.
        assert_eq!(engine.poll().await.unwrap().map(|r| r.bpm), Some(65.0));
        assert_eq!(engine.poll().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_end_to_end() {
        let samples = create_samples_csv(60);
        let results = create_results_jsonl(&[GOOD_AT_30]);
        let config = ReplayConfig {
            samples_path: samples.path().to_path_buf(),
            results_path: results.path().to_path_buf(),
            speed: 1.0,
            orchestrator: OrchestratorConfig::default()
                .with_buffer_capacity(60)
                .with_display_window(30),
        };

        let mut out = Vec::new();
        let summary = run(&config, &mut out).await.unwrap();

        assert_eq!(summary.samples, 60);
        assert_eq!(summary.snapshots, 1);
        assert_eq!(summary.final_state, LifecycleState::Idle);
        assert_eq!(summary.stats.samples_accepted, 60);

        let last = summary.last_snapshot.unwrap();
        assert_eq!(last.bpm, 72.0);
        assert_eq!(last.confidence, 0.8);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"bpm\":72.0"));
    }

    #[tokio::test]
    async fn test_replay_rejects_zero_speed() {
        let config = ReplayConfig {
            speed: 0.0,
            ..Default::default()
        };
        let mut out = Vec::new();
        assert!(matches!(
            run(&config, &mut out).await,
            Err(ReplayError::InvalidFormat(_))
        ));
    }
}
