// VitalStream Testdata - Scripted analysis engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Scripted engine for driving the orchestrator in tests.
//!
//! An [`EngineScript`] is shared between the test and every engine the
//! factory creates. The test queues poll results and failures up front and
//! inspects what the orchestrator pushed afterwards.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use vitalstream::{AnalysisConfig, AnalysisEngine, EngineError, EngineFactory, RawEngineResult};

#[derive(Debug, Default)]
struct ScriptState {
    results: VecDeque<Option<RawEngineResult>>,
    create_error: Option<EngineError>,
    push_error: Option<EngineError>,
    poll_error: Option<EngineError>,
    poll_delay: Option<Duration>,
    pushed: Vec<f64>,
    push_calls: usize,
    poll_calls: usize,
    created: usize,
    destroyed: usize,
    last_sample_rate: Option<f64>,
}

/// Shared script and recorder.
#[derive(Debug, Clone, Default)]
pub struct EngineScript {
    state: Arc<Mutex<ScriptState>>,
}

impl EngineScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for a future poll.
    pub fn push_result(&self, result: RawEngineResult) -> &Self {
        self.state.lock().results.push_back(Some(result));
        self
    }

    /// Queue an empty poll.
    pub fn push_empty(&self) -> &Self {
        self.state.lock().results.push_back(None);
        self
    }

    /// Next `create` fails.
    pub fn fail_create(&self, err: EngineError) {
        self.state.lock().create_error = Some(err);
    }

    /// Next `push` fails.
    pub fn fail_push(&self, err: EngineError) {
        self.state.lock().push_error = Some(err);
    }

    /// Next `poll` fails.
    pub fn fail_poll(&self, err: EngineError) {
        self.state.lock().poll_error = Some(err);
    }

    /// Make every poll take this long.
    pub fn set_poll_delay(&self, delay: Duration) {
        self.state.lock().poll_delay = Some(delay);
    }

    /// Every sample pushed so far, across engines.
    pub fn pushed(&self) -> Vec<f64> {
        self.state.lock().pushed.clone()
    }

    pub fn push_calls(&self) -> usize {
        self.state.lock().push_calls
    }

    pub fn poll_calls(&self) -> usize {
        self.state.lock().poll_calls
    }

    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    pub fn destroyed(&self) -> usize {
        self.state.lock().destroyed
    }

    /// Sample rate passed to the most recent `create`.
    pub fn last_sample_rate(&self) -> Option<f64> {
        self.state.lock().last_sample_rate
    }

    /// Factory producing engines bound to this script.
    pub fn factory(&self) -> ScriptedEngineFactory {
        ScriptedEngineFactory {
            script: self.clone(),
        }
    }
}

/// Factory for [`ScriptedEngine`].
#[derive(Debug, Clone)]
pub struct ScriptedEngineFactory {
    script: EngineScript,
}

#[async_trait]
impl EngineFactory for ScriptedEngineFactory {
    type Engine = ScriptedEngine;

    async fn create(
        &self,
        sample_rate: f64,
        _config: &AnalysisConfig,
    ) -> Result<ScriptedEngine, EngineError> {
        let mut state = self.script.state.lock();
        state.last_sample_rate = Some(sample_rate);
        if let Some(err) = state.create_error.take() {
            return Err(err);
        }
        state.created += 1;
        Ok(ScriptedEngine {
            script: self.script.clone(),
            destroyed: false,
        })
    }
}

/// Engine replaying an [`EngineScript`].
#[derive(Debug)]
pub struct ScriptedEngine {
    script: EngineScript,
    destroyed: bool,
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn push(&mut self, samples: &[f64]) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let mut state = self.script.state.lock();
        state.push_calls += 1;
        if let Some(err) = state.push_error.take() {
            return Err(err);
        }
        state.pushed.extend_from_slice(samples);
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<RawEngineResult>, EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let delay = self.script.state.lock().poll_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.script.state.lock();
        state.poll_calls += 1;
        if let Some(err) = state.poll_error.take() {
            return Err(err);
        }
        Ok(state.results.pop_front().flatten())
    }

    async fn destroy(&mut self) -> Result<(), EngineError> {
        if !self.destroyed {
            self.destroyed = true;
            self.script.state.lock().destroyed += 1;
        }
        Ok(())
    }
}
