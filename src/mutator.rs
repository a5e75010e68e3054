//! Debounced parameter mutator.
//!
//! Slider drags produce bursts of value changes; each regeneration round
//! trip to the engine is expensive. The mutator coalesces rapid changes
//! into a single delayed commit: every `schedule` call (re)arms a fixed
//! delay, and only once the delay elapses without further calls does one
//! batch of values go to the engine followed by one `customize` call.
//! This is a debounce, not a throttle.
//!
//! Implemented as a worker task owning the session handle, driven by an
//! explicit state machine: Idle (no buffered changes), Pending (buffer +
//! armed deadline), Committing (batch in flight). Commands arriving while
//! a commit is in flight are buffered for the next commit; they never
//! join the in-flight one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::engine::EngineSession;
use crate::param::ParamValue;

/// Delay between the last scheduled change and the commit.
pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_millis(300);

/// Mutator state, published on a watch channel for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MutatorStatus {
    Idle,
    /// Changes are buffered and the commit timer is armed.
    Pending,
    /// A batch is being applied and regenerated.
    Committing,
    /// The last regeneration failed. Values stay as set; the next
    /// schedule/commit clears this.
    Failed(String),
}

enum Command {
    Schedule { id: String, value: ParamValue },
    Flush { ack: oneshot::Sender<()> },
}

/// Handle to the mutator worker. Dropping it flushes any pending batch
/// best-effort before the worker exits.
pub struct ParameterMutator {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<MutatorStatus>,
}

impl ParameterMutator {
    /// Spawn the worker against a live engine session.
    pub fn spawn<S: EngineSession>(session: Arc<S>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(MutatorStatus::Idle);
        tokio::spawn(run_worker(session, delay, rx, status_tx));
        Self {
            tx,
            status: status_rx,
        }
    }

    /// Record the latest value for a parameter and (re)arm the commit
    /// timer. The last call per parameter before the commit wins.
    pub fn schedule(&self, id: impl Into<String>, value: ParamValue) {
        let _ = self.tx.send(Command::Schedule {
            id: id.into(),
            value,
        });
    }

    /// Commit any pending batch immediately and wait for it to finish.
    /// Used when the caller needs a synchronous guarantee, e.g. before
    /// navigating away.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush { ack }).is_ok() {
            let _ = done.await;
        }
    }

    /// Watch the mutator's status.
    pub fn status(&self) -> watch::Receiver<MutatorStatus> {
        self.status.clone()
    }
}

async fn run_worker<S: EngineSession>(
    session: Arc<S>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<MutatorStatus>,
) {
    let mut buffer: HashMap<String, ParamValue> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let command = if let Some(at) = deadline {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => Some(cmd),
                    None => break,
                },
                _ = sleep_until(at) => None,
            }
        } else {
            match rx.recv().await {
                Some(cmd) => Some(cmd),
                None => break,
            }
        };

        match command {
            Some(Command::Schedule { id, value }) => {
                buffer.insert(id, value);
                // Debounce: the timer restarts on every call.
                deadline = Some(Instant::now() + delay);
                let _ = status.send(MutatorStatus::Pending);
            }
            Some(Command::Flush { ack }) => {
                deadline = None;
                commit(&session, &mut buffer, &status).await;
                let _ = ack.send(());
            }
            // Timer fired.
            None => {
                deadline = None;
                commit(&session, &mut buffer, &status).await;
            }
        }
    }

    // Handle dropped: flush whatever is still buffered.
    if !buffer.is_empty() {
        commit(&session, &mut buffer, &status).await;
    }
}

async fn commit<S: EngineSession>(
    session: &Arc<S>,
    buffer: &mut HashMap<String, ParamValue>,
    status: &watch::Sender<MutatorStatus>,
) {
    if buffer.is_empty() {
        let _ = status.send(MutatorStatus::Idle);
        return;
    }

    let batch: Vec<(String, ParamValue)> = buffer.drain().collect();
    debug!(changes = batch.len(), "Committing parameter batch");
    let _ = status.send(MutatorStatus::Committing);

    for (id, value) in &batch {
        session.set_parameter_value(id, value);
    }

    match session.customize().await {
        Ok(()) => {
            let _ = status.send(MutatorStatus::Idle);
        }
        Err(e) => {
            // Values stay as set so the user can correct and retry;
            // the batch is not re-queued.
            warn!("Regeneration failed: {}", e);
            let _ = status.send(MutatorStatus::Failed(e.to_string()));
        }
    }
}
