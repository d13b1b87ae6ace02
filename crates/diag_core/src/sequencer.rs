//! Runs the probe list strictly in order, one probe at a time.
//!
//! For every probe the sequencer marks its status sink as running, awaits the
//! call, writes the outcome, and advances the shared progress by exactly one
//! step, whether the probe succeeded or not. A failing probe is reported and
//! the sequence moves on; `run` itself never fails.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{domain::ProbeId, error::ProbeError};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    navigation::Navigator,
    outcome::{running_line, ProbeOutcome},
    overlay::ProgressReporter,
    probes::{ProbePayload, ProbeSpec},
    status::StatusBoard,
};

const DEFAULT_START_MESSAGE: &str = "Running network diagnostics";
const DEFAULT_COMPLETE_MESSAGE: &str = "Diagnostics complete";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("probe id {0} is declared more than once")]
    DuplicateProbe(ProbeId),
    #[error("navigation destination must not be empty")]
    MissingDestination,
}

/// Headlines shown on the progress overlay while the sequence runs.
#[derive(Debug, Clone)]
pub struct SequenceMessages {
    pub start: String,
    pub complete: String,
}

impl Default for SequenceMessages {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MESSAGE.to_string(),
            complete: DEFAULT_COMPLETE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub id: ProbeId,
    pub label: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    pub status: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub destination: String,
    pub probes: Vec<ProbeRecord>,
}

impl SequenceReport {
    pub fn failed(&self) -> usize {
        self.probes.iter().filter(|p| p.outcome.is_failed()).count()
    }
}

/// Bookkeeping of one `run` invocation.
struct SequenceRun {
    total: usize,
    completed: usize,
}

impl SequenceRun {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
        }
    }

    fn advance(&mut self) -> usize {
        debug_assert!(self.completed < self.total, "advanced past the last probe");
        self.completed = (self.completed + 1).min(self.total);
        self.completed
    }
}

pub struct ProbeSequencerBuilder {
    reporter: Arc<dyn ProgressReporter>,
    navigator: Arc<dyn Navigator>,
    probes: Vec<ProbeSpec>,
    board: StatusBoard,
    destination: String,
    probe_timeout: Option<Duration>,
    messages: SequenceMessages,
}

impl ProbeSequencerBuilder {
    pub fn probe(mut self, probe: ProbeSpec) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probes(mut self, probes: impl IntoIterator<Item = ProbeSpec>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn status_board(mut self, board: StatusBoard) -> Self {
        self.board = board;
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Bounds every probe call. `None` waits for as long as the call takes.
    pub fn probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn messages(mut self, messages: SequenceMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn build(self) -> Result<ProbeSequencer, SequencerError> {
        let mut seen = HashSet::new();
        for probe in &self.probes {
            if !seen.insert(&probe.id) {
                return Err(SequencerError::DuplicateProbe(probe.id.clone()));
            }
        }
        if self.destination.trim().is_empty() {
            return Err(SequencerError::MissingDestination);
        }

        Ok(ProbeSequencer {
            probes: self.probes,
            reporter: self.reporter,
            board: self.board,
            navigator: self.navigator,
            destination: self.destination,
            probe_timeout: self.probe_timeout,
            messages: self.messages,
        })
    }
}

pub struct ProbeSequencer {
    probes: Vec<ProbeSpec>,
    reporter: Arc<dyn ProgressReporter>,
    board: StatusBoard,
    navigator: Arc<dyn Navigator>,
    destination: String,
    probe_timeout: Option<Duration>,
    messages: SequenceMessages,
}

impl ProbeSequencer {
    pub fn builder(
        reporter: Arc<dyn ProgressReporter>,
        navigator: Arc<dyn Navigator>,
    ) -> ProbeSequencerBuilder {
        ProbeSequencerBuilder {
            reporter,
            navigator,
            probes: Vec::new(),
            board: StatusBoard::new(),
            destination: String::new(),
            probe_timeout: None,
            messages: SequenceMessages::default(),
        }
    }

    pub async fn run(&self) -> SequenceReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut run = SequenceRun::new(self.probes.len());
        info!(%run_id, total = run.total, "starting probe sequence");

        self.reporter.start(Some(self.messages.start.as_str())).await;

        let mut records = Vec::with_capacity(run.total);
        for (index, probe) in self.probes.iter().enumerate() {
            self.board.write(&probe.id, &running_line(&probe.label));

            let began = Instant::now();
            let outcome = ProbeOutcome::from_result(self.invoke(probe).await);
            let elapsed_ms = began.elapsed().as_millis() as u64;

            let status = outcome.status_line(&probe.label);
            self.board.write(&probe.id, &status);
            match &outcome {
                ProbeOutcome::Failed { failure } => warn!(
                    %run_id,
                    probe = %probe.id,
                    code = ?failure.code,
                    error = %failure.message,
                    "probe failed"
                ),
                ProbeOutcome::Degraded { error } => warn!(
                    %run_id,
                    probe = %probe.id,
                    error = %error,
                    "probe reported an error"
                ),
                ProbeOutcome::Succeeded { .. } => info!(
                    %run_id,
                    probe = %probe.id,
                    elapsed_ms,
                    "probe finished"
                ),
            }

            let completed = run.advance();
            let message = self.progress_message(index + 1);
            self.reporter
                .update(completed, run.total, Some(message.as_str()))
                .await;

            records.push(ProbeRecord {
                id: probe.id.clone(),
                label: probe.label.clone(),
                outcome,
                status,
                elapsed_ms,
            });
        }

        self.reporter.done().await;
        info!(%run_id, completed = run.completed, "probe sequence finished");
        self.navigator.navigate(&self.destination).await;

        SequenceReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            destination: self.destination.clone(),
            probes: records,
        }
    }

    async fn invoke(&self, probe: &ProbeSpec) -> Result<ProbePayload, ProbeError> {
        let call = probe.invoker.invoke();
        match self.probe_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ProbeError::TimedOut(limit))),
            None => call.await,
        }
    }

    /// Headline after `completed` probes: the next probe, or the end.
    fn progress_message(&self, completed: usize) -> String {
        match self.probes.get(completed) {
            Some(next) => format!("Running {}", next.label),
            None => self.messages.complete.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
