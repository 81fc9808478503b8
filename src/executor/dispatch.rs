//! Dispatch loop, rate gate and deadline for one run
//!
//! The dispatcher is the only producer of [`DispatchToken`]s. It pushes them
//! into a bounded queue that the workers share, so the queue depth is the
//! backpressure between dispatch and the network.

use super::request::RequestExecutor;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Permission for a worker to send one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchToken {
    /// Zero-based dispatch number
    pub sequence: u64,
}

/// Why dispatch stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured request count was dispatched
    RequestCount,
    /// The configured duration elapsed
    Deadline,
    /// The caller cancelled the run
    Cancelled,
    /// Every worker exited before dispatch finished
    WorkersGone,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::RequestCount => "request-count",
            StopReason::Deadline => "deadline",
            StopReason::Cancelled => "cancelled",
            StopReason::WorkersGone => "workers-gone",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiving end of the dispatch queue, shared by every worker of a run
pub type TokenQueue = Arc<Mutex<mpsc::Receiver<DispatchToken>>>;

/// Consume tokens until the queue closes
///
/// Tokens still queued when the run stops are dropped without sending.
/// Requests already in flight observe the same stop through the executor.
pub async fn worker_loop(queue: TokenQueue, executor: Arc<RequestExecutor>) {
    loop {
        let token = {
            let mut receiver = queue.lock().await;
            receiver.recv().await
        };

        match token {
            Some(token) if !executor.is_stopped() => executor.execute(token.sequence).await,
            Some(_) => continue,
            None => break,
        }
    }
}

/// Spawn the task that releases one dispatch permit every `interval`
///
/// The permit channel holds a single permit and missed ticks are skipped,
/// so a stalled dispatcher never catches up in a burst.
pub fn spawn_rate_gate(interval: Duration, shutdown: CancellationToken) -> (mpsc::Receiver<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                sent = tx.send(()) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    });

    (rx, handle)
}

/// Spawn the task that cancels `stop` once `duration` has elapsed
///
/// Exits quietly if `shutdown` fires first.
pub fn spawn_deadline(duration: Duration, stop: CancellationToken, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {}
            _ = time::sleep(duration) => stop.cancel(),
        }
    })
}

/// Produce tokens until a stop condition fires
///
/// `limit` of zero means no request count bound. Returns the number of
/// tokens enqueued and the reason dispatch ended. The sender is dropped on
/// return, which lets the workers drain and exit.
pub async fn dispatch(
    sender: mpsc::Sender<DispatchToken>,
    limit: u64,
    mut gate: Option<mpsc::Receiver<()>>,
    stop: &CancellationToken,
    caller: &CancellationToken,
) -> (u64, StopReason) {
    let stopped = || {
        if caller.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::Deadline
        }
    };

    let mut sequence = 0u64;
    let reason = loop {
        if limit > 0 && sequence >= limit {
            break StopReason::RequestCount;
        }

        if let Some(permits) = gate.as_mut() {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break stopped(),
                permit = permits.recv() => {
                    if permit.is_none() {
                        break stopped();
                    }
                }
            }
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => break stopped(),
            sent = sender.send(DispatchToken { sequence }) => {
                if sent.is_err() {
                    break StopReason::WorkersGone;
                }
            }
        }

        sequence += 1;
    };

    (sequence, reason)
}
