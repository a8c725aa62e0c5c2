//! Streaming orchestrator
//!
//! [`StreamingOrchestrator`] owns the sensing lifecycle. Samples are buffered
//! by [`add_sample`](StreamingOrchestrator::add_sample); a fixed-interval
//! tick flushes the pending queue to the engine, polls it, and publishes a
//! derived [`MetricsSnapshot`] on the event channel.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle ──start()──▶ Starting ──first result──▶ Running
//!   ▲                   │                          │
//!   │                   └──────── stop() / engine error
//!   │                                  ▼
//!   └──────── engine destroyed ──── Stopping
//! ```
//!
//! # Concurrency
//!
//! At most one tick touches the engine at a time: the engine sits behind an
//! async mutex taken with `try_lock`, so a tick that fires while the previous
//! push/poll is still outstanding is skipped. `add_sample` never awaits; it
//! only takes a short synchronous lock on the sample buffers.
//!
//! # Example
//!
//! ```rust,ignore
//! let (mut orchestrator, mut events) =
//!     StreamingOrchestrator::new(OrchestratorConfig::camera_30fps(), factory)?;
//!
//! orchestrator.start().await?;
//! orchestrator.add_sample(Sample::new(0.42, 0));
//!
//! while let Some(event) = events.recv().await {
//!     if let OrchestratorEvent::Metrics { snapshot, .. } = event {
//!         println!("{} bpm", snapshot.bpm);
//!     }
//! }
//! ```

use crate::config::OrchestratorConfig;
use crate::derive::{DerivationContext, FallbackMetricsDeriver};
use crate::engine::{AnalysisEngine, EngineFactory};
use crate::error::{ConfigError, EngineError, LifecycleError, VitalError};
use crate::history::HistoryBuffer;
use crate::types::{LifecycleState, MetricsSnapshot, RawEngineResult, Sample};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Events published to the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// Emitted on every lifecycle transition
    StateChanged(LifecycleState),
    /// Emitted after every tick that produced a result
    Metrics {
        snapshot: MetricsSnapshot,
        /// Displayed history window, oldest first
        history: Vec<f64>,
    },
    /// Engine failure that forced the orchestrator back to idle
    EngineFailed(EngineError),
}

/// Receiving half of the event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<OrchestratorEvent>;

/// Counters since construction.
///
/// `samples_pushed` is reset on every `start()`; it is the engine's
/// cumulative buffer length used for peak remapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub samples_accepted: u64,
    pub samples_ignored: u64,
    pub pending_overflow: u64,
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub results: u64,
    pub samples_pushed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    samples_accepted: AtomicU64,
    samples_ignored: AtomicU64,
    pending_overflow: AtomicU64,
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    results: AtomicU64,
    samples_pushed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_ignored: self.samples_ignored.load(Ordering::Relaxed),
            pending_overflow: self.pending_overflow.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            results: self.results.load(Ordering::Relaxed),
            samples_pushed: self.samples_pushed.load(Ordering::Relaxed),
        }
    }
}

/// History, pending queue and latest side confidence.
#[derive(Debug)]
struct SampleBuffers {
    history: HistoryBuffer<f64>,
    pending: VecDeque<f64>,
    side_confidence: Option<f64>,
}

impl SampleBuffers {
    fn clear(&mut self) {
        self.history.clear();
        self.pending.clear();
        self.side_confidence = None;
    }
}

/// History window and side confidence captured when a batch is drained.
#[derive(Debug)]
struct DisplayFrame {
    history: Vec<f64>,
    side_confidence: Option<f64>,
}

/// State shared between the orchestrator handle and its tick task.
struct Shared<E> {
    config: OrchestratorConfig,
    deriver: FallbackMetricsDeriver,
    state: Mutex<LifecycleState>,
    buffers: Mutex<SampleBuffers>,
    engine: AsyncMutex<Option<E>>,
    timer: Mutex<Option<CancellationToken>>,
    latest: Mutex<Option<MetricsSnapshot>>,
    counters: Counters,
    events: mpsc::UnboundedSender<OrchestratorEvent>,
}

impl<E: AnalysisEngine> Shared<E> {
    fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn emit(&self, event: OrchestratorEvent) {
        // A dropped receiver is not an error for the producer.
        let _ = self.events.send(event);
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.lock();
        if *state == next {
            return;
        }
        debug!("Lifecycle {} -> {}", *state, next);
        *state = next;
        self.emit(OrchestratorEvent::StateChanged(next));
    }

    /// Move `from -> to` only if currently in `from`.
    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        self.emit(OrchestratorEvent::StateChanged(to));
        true
    }

    fn disarm(&self) {
        if let Some(token) = self.timer.lock().take() {
            token.cancel();
        }
    }

    fn add_sample(&self, sample: Sample) {
        let mut buffers = self.buffers.lock();
        // State is read under the buffer lock so a concurrent stop either
        // clears this sample or rejects it.
        if !self.state().is_active() {
            self.counters.samples_ignored.fetch_add(1, Ordering::Relaxed);
            return;
        }

        buffers.history.push(sample.value);
        buffers.pending.push_back(sample.value);
        if let Some(confidence) = sample.side_confidence {
            buffers.side_confidence = Some(confidence);
        }

        let cap = self.config.buffer_capacity;
        if buffers.pending.len() > cap {
            let overflow = buffers.pending.len() - cap;
            buffers.pending.drain(..overflow);
            self.counters
                .pending_overflow
                .fetch_add(overflow as u64, Ordering::Relaxed);
            warn!("Pending queue full, dropped {} oldest samples", overflow);
        }
        self.counters.samples_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// One flush / poll / derive cycle.
    async fn tick(&self) {
        if !self.state().is_active() {
            return;
        }

        let mut guard = match self.engine.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.counters.skipped_ticks.fetch_add(1, Ordering::Relaxed);
                warn!("Previous tick still awaiting the engine, skipping");
                return;
            }
        };
        let Some(engine) = guard.as_mut() else {
            return;
        };
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let (batch, frame) = self.take_batch();
        let outcome = self.exchange(engine, batch).await;
        match outcome {
            Ok(Some(raw)) => self.publish(&raw, frame),
            Ok(None) => debug!("No new engine result"),
            Err(err) => self.force_stop(&mut guard, err).await,
        }
    }

    /// Drain the pending queue together with the display window it ends.
    ///
    /// Both are taken under one lock so the window stays aligned with the
    /// engine's sample count even if samples arrive while the engine is busy.
    fn take_batch(&self) -> (Vec<f64>, DisplayFrame) {
        let mut buffers = self.buffers.lock();
        let batch = buffers.pending.drain(..).collect();
        let frame = DisplayFrame {
            history: buffers.history.tail(self.config.display_window_size),
            side_confidence: buffers.side_confidence,
        };
        (batch, frame)
    }

    async fn exchange(
        &self,
        engine: &mut E,
        batch: Vec<f64>,
    ) -> Result<Option<RawEngineResult>, EngineError> {
        if !batch.is_empty() {
            engine.push(&batch).await?;
            let total = self
                .counters
                .samples_pushed
                .fetch_add(batch.len() as u64, Ordering::Relaxed)
                + batch.len() as u64;
            debug!("Pushed {} samples (total {})", batch.len(), total);
        }
        engine.poll().await
    }

    fn publish(&self, raw: &RawEngineResult, frame: DisplayFrame) {
        if !self.state().is_active() {
            debug!("Dropping engine result received after stop");
            return;
        }

        let window = self.config.display_window_size;
        let DisplayFrame {
            history,
            side_confidence,
        } = frame;
        let ctx = DerivationContext {
            side_confidence,
            history_tail: Some(&history),
            buffer_length: self.counters.samples_pushed.load(Ordering::Relaxed),
            window_size: window,
        };
        let snapshot = self.deriver.derive(raw, &ctx);
        debug!(
            "Snapshot: {:.1} bpm, confidence {:.2} ({:?}), snr {:.1} dB ({:?})",
            snapshot.bpm,
            snapshot.confidence,
            snapshot.sources.confidence,
            snapshot.snr_db,
            snapshot.sources.snr
        );

        self.counters.results.fetch_add(1, Ordering::Relaxed);
        *self.latest.lock() = Some(snapshot.clone());
        self.emit(OrchestratorEvent::Metrics { snapshot, history });

        if self.transition(LifecycleState::Starting, LifecycleState::Running) {
            info!("First engine result received, running");
        }
    }

    /// Engine failure inside a tick: tear down to idle and report once.
    async fn force_stop(&self, guard: &mut AsyncMutexGuard<'_, Option<E>>, err: EngineError) {
        if self.state() == LifecycleState::Idle {
            return;
        }
        error!("Engine failure, stopping: {}", err);
        self.emit(OrchestratorEvent::EngineFailed(err));
        self.set_state(LifecycleState::Stopping);
        self.disarm();
        self.buffers.lock().clear();
        if let Some(mut engine) = guard.take() {
            if let Err(e) = engine.destroy().await {
                warn!("Engine destroy failed: {}", e);
            }
        }
        self.set_state(LifecycleState::Idle);
    }
}

/// Drives the sensing/analysis lifecycle against an [`AnalysisEngine`].
pub struct StreamingOrchestrator<F: EngineFactory> {
    factory: F,
    shared: Arc<Shared<F::Engine>>,
    ticker: Option<JoinHandle<()>>,
}

impl<F: EngineFactory> StreamingOrchestrator<F> {
    /// Create an idle orchestrator and the receiver for its events.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new(config: OrchestratorConfig, factory: F) -> Result<(Self, EventReceiver), ConfigError> {
        config.validate()?;
        let history = HistoryBuffer::new(config.buffer_capacity)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let shared = Shared {
            buffers: Mutex::new(SampleBuffers {
                history,
                pending: VecDeque::with_capacity(config.buffer_capacity),
                side_confidence: None,
            }),
            config,
            deriver: FallbackMetricsDeriver::new(),
            state: Mutex::new(LifecycleState::Idle),
            engine: AsyncMutex::new(None),
            timer: Mutex::new(None),
            latest: Mutex::new(None),
            counters: Counters::default(),
            events: tx,
        };

        Ok((
            Self {
                factory,
                shared: Arc::new(shared),
                ticker: None,
            },
            rx,
        ))
    }

    /// Begin a sensing session.
    ///
    /// Creates the engine, resets buffers and the sample counter, and arms
    /// the tick timer. The orchestrator stays in `Starting` until the first
    /// tick yields a result.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidState`] if not idle
    /// - [`EngineError`] if the engine cannot be created; the orchestrator
    ///   is back to idle when this returns
    pub async fn start(&mut self) -> Result<(), VitalError> {
        let current = self.shared.state();
        if current != LifecycleState::Idle {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state: current,
            }
            .into());
        }
        // Task left behind by a forced stop has already been disarmed.
        self.ticker.take();

        let config = &self.shared.config;
        info!(
            "Starting: {} Hz, capacity {}, tick {} ms, window {}",
            config.sample_rate,
            config.buffer_capacity,
            config.pending_flush_interval_ms,
            config.display_window_size
        );
        self.shared.set_state(LifecycleState::Starting);

        let engine = match self
            .factory
            .create(config.sample_rate, &config.analysis)
            .await
        {
            Ok(engine) => engine,
            Err(err) => {
                error!("Engine creation failed: {}", err);
                self.shared.set_state(LifecycleState::Stopping);
                self.shared.set_state(LifecycleState::Idle);
                return Err(err.into());
            }
        };

        self.shared.buffers.lock().clear();
        self.shared.counters.samples_pushed.store(0, Ordering::Relaxed);
        *self.shared.latest.lock() = None;
        *self.shared.engine.lock().await = Some(engine);

        self.arm();
        Ok(())
    }

    fn arm(&mut self) {
        let token = CancellationToken::new();
        *self.shared.timer.lock() = Some(token.clone());

        let shared = Arc::clone(&self.shared);
        let period = Duration::from_millis(self.shared.config.pending_flush_interval_ms);

        self.ticker = Some(tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately; the first flush is one period out.
            timer.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    _ = timer.tick() => shared.tick().await,
                }
            }
            debug!("Tick timer disarmed");
        }));
    }

    /// End the session.
    ///
    /// Disarms the timer before clearing buffers, waits for any in-flight
    /// tick, then releases the engine. No-op when already idle.
    pub async fn stop(&mut self) {
        if self.shared.state() == LifecycleState::Idle {
            return;
        }
        info!("Stopping");
        self.shared.set_state(LifecycleState::Stopping);
        self.shared.disarm();
        self.shared.buffers.lock().clear();

        let engine = self.shared.engine.lock().await.take();
        if let Some(mut engine) = engine {
            if let Err(e) = engine.destroy().await {
                warn!("Engine destroy failed: {}", e);
            }
        }
        if let Some(handle) = self.ticker.take() {
            if let Err(e) = handle.await {
                warn!("Tick task ended abnormally: {}", e);
            }
        }

        self.shared.set_state(LifecycleState::Idle);
    }

    /// Run one flush/poll cycle now.
    ///
    /// Same code path as the timer; skipped if another tick is in flight.
    pub async fn tick(&self) {
        self.shared.tick().await;
    }

    /// Queue a sample. Dropped unless starting or running.
    pub fn add_sample(&self, sample: Sample) {
        self.shared.add_sample(sample);
    }

    /// Queue several samples in order.
    pub fn add_samples(&self, samples: impl IntoIterator<Item = Sample>) {
        for sample in samples {
            self.shared.add_sample(sample);
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Last snapshot published in this session
    pub fn latest_snapshot(&self) -> Option<MetricsSnapshot> {
        self.shared.latest.lock().clone()
    }

    /// Full history, oldest first
    pub fn history(&self) -> Vec<f64> {
        self.shared.buffers.lock().history.get_all()
    }

    /// Displayed history window, oldest first
    pub fn display_history(&self) -> Vec<f64> {
        let window = self.shared.config.display_window_size;
        self.shared.buffers.lock().history.tail(window)
    }

    /// Number of history entries
    pub fn history_len(&self) -> usize {
        self.shared.buffers.lock().history.size()
    }

    /// Samples waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.shared.buffers.lock().pending.len()
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.shared.counters.snapshot()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }
}

impl<F: EngineFactory> Drop for StreamingOrchestrator<F> {
    fn drop(&mut self) {
        self.shared.disarm();

        // destroy() is async; hand the engine to a task on the current runtime.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(&self.shared);
                handle.spawn(async move {
                    let engine = shared.engine.lock().await.take();
                    if let Some(mut engine) = engine {
                        debug!("Releasing engine of dropped orchestrator");
                        if let Err(e) = engine.destroy().await {
                            warn!("Engine destroy failed: {}", e);
                        }
                    }
                });
            }
            Err(_) => {
                if self.shared.state() != LifecycleState::Idle {
                    warn!("Orchestrator dropped outside a runtime, engine not destroyed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Script {
        results: VecDeque<Option<RawEngineResult>>,
        pushed: Vec<f64>,
        fail_poll: bool,
        destroyed: bool,
    }

    struct TestEngine(Arc<Mutex<Script>>);

    #[async_trait]
    impl AnalysisEngine for TestEngine {
        async fn push(&mut self, samples: &[f64]) -> Result<(), EngineError> {
            self.0.lock().pushed.extend_from_slice(samples);
            Ok(())
        }

        async fn poll(&mut self) -> Result<Option<RawEngineResult>, EngineError> {
            let mut script = self.0.lock();
            if script.fail_poll {
                return Err(EngineError::Poll("boom".to_string()));
            }
            Ok(script.results.pop_front().flatten())
        }

        async fn destroy(&mut self) -> Result<(), EngineError> {
            self.0.lock().destroyed = true;
            Ok(())
        }
    }

    struct TestFactory(Arc<Mutex<Script>>);

    #[async_trait]
    impl EngineFactory for TestFactory {
        type Engine = TestEngine;

        async fn create(&self, sample_rate: f64, _config: &AnalysisConfig) -> Result<TestEngine, EngineError> {
            if sample_rate > 1000.0 {
                return Err(EngineError::Unsupported("sample rate".to_string()));
            }
            Ok(TestEngine(Arc::clone(&self.0)))
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_buffer_capacity(8)
            .with_display_window(4)
            // Long interval: these tests drive ticks by hand.
            .with_flush_interval_ms(60_000)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_invalid_config_rejected() {
        let script = Arc::new(Mutex::new(Script::default()));
        let result =
            StreamingOrchestrator::new(config().with_buffer_capacity(0), TestFactory(script));
        assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
    }

    #[tokio::test]
    async fn test_samples_ignored_while_idle() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (orch, _rx) = StreamingOrchestrator::new(config(), TestFactory(script)).unwrap();

        orch.add_sample(Sample::new(1.0, 0));
        assert_eq!(orch.history_len(), 0);
        assert_eq!(orch.pending_len(), 0);
        assert_eq!(orch.stats().samples_ignored, 1);
    }

    #[tokio::test]
    async fn test_pending_queue_capped() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, _rx) =
            StreamingOrchestrator::new(config(), TestFactory(Arc::clone(&script))).unwrap();
        orch.start().await.unwrap();

        for i in 0..11 {
            orch.add_sample(Sample::new(i as f64, i));
        }
        assert_eq!(orch.pending_len(), 8);
        assert_eq!(orch.history_len(), 8);
        assert_eq!(orch.stats().pending_overflow, 3);

        orch.tick().await;
        let pushed = script.lock().pushed.clone();
        assert_eq!(pushed, (3..11).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(orch.pending_len(), 0);
        assert_eq!(orch.stats().samples_pushed, 8);

        orch.stop().await;
    }

    #[tokio::test]
    async fn test_start_twice_is_lifecycle_error() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, _rx) = StreamingOrchestrator::new(config(), TestFactory(script)).unwrap();
        orch.start().await.unwrap();

        let err = orch.start().await.unwrap_err();
        assert_eq!(
            err,
            VitalError::Lifecycle(LifecycleError::InvalidState {
                operation: "start",
                state: LifecycleState::Starting,
            })
        );
        assert_eq!(orch.state(), LifecycleState::Starting);
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_engine_create_failure_returns_to_idle() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, mut rx) = StreamingOrchestrator::new(
            config().with_sample_rate(2000.0),
            TestFactory(script),
        )
        .unwrap();

        let err = orch.start().await.unwrap_err();
        assert!(matches!(err, VitalError::Engine(EngineError::Unsupported(_))));
        assert_eq!(orch.state(), LifecycleState::Idle);
        assert_eq!(
            drain(&mut rx),
            vec![
                OrchestratorEvent::StateChanged(LifecycleState::Starting),
                OrchestratorEvent::StateChanged(LifecycleState::Stopping),
                OrchestratorEvent::StateChanged(LifecycleState::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn test_first_result_moves_to_running() {
        let script = Arc::new(Mutex::new(Script::default()));
        script.lock().results.push_back(None);
        script.lock().results.push_back(Some(RawEngineResult {
            bpm: 60.0,
            ..Default::default()
        }));
        let (mut orch, mut rx) =
            StreamingOrchestrator::new(config(), TestFactory(Arc::clone(&script))).unwrap();
        orch.start().await.unwrap();

        orch.tick().await;
        assert_eq!(orch.state(), LifecycleState::Starting);
        assert!(orch.latest_snapshot().is_none());

        orch.add_sample(Sample::new(0.5, 0));
        orch.tick().await;
        assert_eq!(orch.state(), LifecycleState::Running);
        assert_eq!(orch.latest_snapshot().map(|s| s.bpm), Some(60.0));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], OrchestratorEvent::Metrics { .. }));
        assert_eq!(
            events[2],
            OrchestratorEvent::StateChanged(LifecycleState::Running)
        );
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_poll_failure_forces_idle() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, mut rx) =
            StreamingOrchestrator::new(config(), TestFactory(Arc::clone(&script))).unwrap();
        orch.start().await.unwrap();
        orch.add_sample(Sample::new(1.0, 0));
        drain(&mut rx);

        script.lock().fail_poll = true;
        orch.tick().await;

        assert_eq!(orch.state(), LifecycleState::Idle);
        assert_eq!(orch.history_len(), 0);
        assert!(script.lock().destroyed);
        assert_eq!(
            drain(&mut rx),
            vec![
                OrchestratorEvent::EngineFailed(EngineError::Poll("boom".to_string())),
                OrchestratorEvent::StateChanged(LifecycleState::Stopping),
                OrchestratorEvent::StateChanged(LifecycleState::Idle),
            ]
        );

        // Recoverable: caller may start again.
        script.lock().fail_poll = false;
        orch.start().await.unwrap();
        assert_eq!(orch.state(), LifecycleState::Starting);
        orch.stop().await;
    }

    #[tokio::test]
    async fn test_drop_while_running_destroys_engine() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, _rx) =
            StreamingOrchestrator::new(config(), TestFactory(Arc::clone(&script))).unwrap();
        orch.start().await.unwrap();

        drop(orch);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(script.lock().destroyed);
    }

    #[tokio::test]
    async fn test_stop_idle_is_noop() {
        let script = Arc::new(Mutex::new(Script::default()));
        let (mut orch, mut rx) = StreamingOrchestrator::new(config(), TestFactory(script)).unwrap();

        orch.stop().await;
        assert_eq!(orch.state(), LifecycleState::Idle);
        assert!(drain(&mut rx).is_empty());
    }
}
