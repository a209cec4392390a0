//! Single-flight, priority-ordered operation scheduler.
//!
//! All lifecycle operations on a room funnel through one
//! [`OperationScheduler`]: a dedicated worker task that runs at most one
//! operation body at a time, picking the next body by priority rather
//! than plain arrival order. The scheduler is the room's sole
//! synchronization device — callers need no locks of their own.
//!
//! The worker is an actor in the usual Tokio shape: an `mpsc` channel in,
//! a `oneshot` reply per operation out. Submissions received while a body
//! runs are drained into a priority heap before the next pop, so a
//! release requested mid-attach overtakes any earlier-queued attach or
//! detach.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

use tokio::sync::{mpsc, oneshot};

use crate::RoomError;

/// The kind of a scheduled lifecycle operation. Determines priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Internal windowed recovery. Runs ahead of everything else.
    Retry,
    /// Room release. Runs ahead of attach/detach so it cannot be starved
    /// behind a backlog of them.
    Release,
    /// Room attach.
    Attach,
    /// Room detach.
    Detach,
}

impl OperationKind {
    /// Higher value runs first. Attach and detach share a priority and
    /// fall back to arrival order.
    fn priority(self) -> u8 {
        match self {
            Self::Retry => 3,
            Self::Release => 2,
            Self::Attach | Self::Detach => 1,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retry => "retry",
            Self::Release => "release",
            Self::Attach => "attach",
            Self::Detach => "detach",
        };
        write!(f, "{s}")
    }
}

type OperationFuture = Pin<Box<dyn Future<Output = Result<(), RoomError>> + Send>>;

struct QueuedOperation {
    kind: OperationKind,
    seq: u64,
    task: OperationFuture,
    reply: oneshot::Sender<Result<(), RoomError>>,
}

impl PartialEq for QueuedOperation {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedOperation {}

impl PartialOrd for QueuedOperation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedOperation {
    /// Max-heap order: higher priority first, then earlier arrival.
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .priority()
            .cmp(&other.kind.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A single-worker task queue serializing all lifecycle operations of one
/// room.
///
/// Created with the room's coordinator and torn down when it is dropped:
/// closing the submission channel lets the worker drain whatever is still
/// queued and exit.
pub struct OperationScheduler {
    submit_tx: mpsc::UnboundedSender<QueuedOperation>,
    queued: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    next_seq: AtomicU64,
}

impl OperationScheduler {
    /// Creates the scheduler and spawns its worker task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new() -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_worker(submit_rx, Arc::clone(&queued), Arc::clone(&running)));

        Self {
            submit_tx,
            queued,
            running,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Submits an operation body and returns a receiver for its result.
    ///
    /// The submission itself is synchronous — the operation is enqueued
    /// (or picked up immediately if the worker is idle) before this
    /// returns. A body's failure is delivered only on this receiver; it
    /// never stops the worker from draining subsequent operations. A
    /// dropped receiver does not cancel the body: once started, an
    /// operation always runs to completion.
    pub fn submit<F>(
        &self,
        kind: OperationKind,
        task: F,
    ) -> oneshot::Receiver<Result<(), RoomError>>
    where
        F: Future<Output = Result<(), RoomError>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let op = QueuedOperation {
            kind,
            seq: self.next_seq.fetch_add(1, AtomicOrdering::Relaxed),
            task: Box::pin(task),
            reply: reply_tx,
        };
        self.queued.fetch_add(1, AtomicOrdering::SeqCst);
        if self.submit_tx.send(op).is_err() {
            // Worker gone: the QueuedOperation (and its reply sender) was
            // dropped, so the receiver resolves with RecvError.
            self.queued.fetch_sub(1, AtomicOrdering::SeqCst);
        }
        reply_rx
    }

    /// Submits an operation and awaits its result.
    pub async fn run<F>(&self, kind: OperationKind, task: F) -> Result<(), RoomError>
    where
        F: Future<Output = Result<(), RoomError>> + Send + 'static,
    {
        match self.submit(kind, task).await {
            Ok(result) => result,
            Err(_) => Err(RoomError::Internal(
                "operation scheduler is shut down".into(),
            )),
        }
    }

    /// Number of operations waiting to run (excludes the running one).
    pub fn pending_jobs(&self) -> usize {
        self.queued.load(AtomicOrdering::SeqCst)
    }

    /// `true` when no operation is running and none are queued.
    pub fn finished_processing(&self) -> bool {
        !self.running.load(AtomicOrdering::SeqCst) && self.pending_jobs() == 0
    }
}

impl Default for OperationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(
    mut submit_rx: mpsc::UnboundedReceiver<QueuedOperation>,
    queued: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
) {
    let mut ready: BinaryHeap<QueuedOperation> = BinaryHeap::new();
    loop {
        // Everything submitted while the previous body ran takes part in
        // the next priority pick.
        while let Ok(op) = submit_rx.try_recv() {
            ready.push(op);
        }

        let Some(op) = ready.pop() else {
            match submit_rx.recv().await {
                Some(op) => {
                    ready.push(op);
                    continue;
                }
                // Scheduler dropped and queue drained.
                None => break,
            }
        };

        // `running` goes up before `queued` comes down so that
        // `finished_processing` never flickers true mid-handoff.
        running.store(true, AtomicOrdering::SeqCst);
        queued.fetch_sub(1, AtomicOrdering::SeqCst);
        tracing::trace!(kind = %op.kind, seq = op.seq, "lifecycle operation started");
        let result = op.task.await;
        running.store(false, AtomicOrdering::SeqCst);
        tracing::trace!(
            kind = %op.kind,
            seq = op.seq,
            ok = result.is_ok(),
            "lifecycle operation finished"
        );
        if op.reply.send(result).is_err() {
            tracing::trace!(kind = %op.kind, "operation caller went away before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Spins until the worker has dequeued everything submitted so far.
    async fn wait_for_pickup(scheduler: &OperationScheduler) {
        while scheduler.pending_jobs() > 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_runs_submitted_operation() {
        let scheduler = OperationScheduler::new();
        let result = scheduler.run(OperationKind::Attach, async { Ok(()) }).await;
        assert!(result.is_ok());
        assert!(scheduler.finished_processing());
    }

    #[tokio::test]
    async fn test_release_overtakes_queued_attach_and_detach() {
        let scheduler = OperationScheduler::new();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        // First operation blocks until we open the gate, so the three
        // submissions below all land in the queue behind it.
        let first = {
            let log = Arc::clone(&log);
            scheduler.submit(OperationKind::Attach, async move {
                let _ = gate_rx.await;
                log.lock().unwrap().push("first");
                Ok(())
            })
        };
        wait_for_pickup(&scheduler).await;
        let detach = {
            let log = Arc::clone(&log);
            scheduler.submit(OperationKind::Detach, async move {
                log.lock().unwrap().push("detach");
                Ok(())
            })
        };
        let attach = {
            let log = Arc::clone(&log);
            scheduler.submit(OperationKind::Attach, async move {
                log.lock().unwrap().push("attach");
                Ok(())
            })
        };
        let release = {
            let log = Arc::clone(&log);
            scheduler.submit(OperationKind::Release, async move {
                log.lock().unwrap().push("release");
                Ok(())
            })
        };

        gate_tx.send(()).unwrap();
        first.await.unwrap().unwrap();
        release.await.unwrap().unwrap();
        detach.await.unwrap().unwrap();
        attach.await.unwrap().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "release", "detach", "attach"]
        );
    }

    #[tokio::test]
    async fn test_equal_priority_runs_in_arrival_order() {
        let scheduler = OperationScheduler::new();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let first = scheduler.submit(OperationKind::Attach, async move {
            let _ = gate_rx.await;
            Ok(())
        });
        wait_for_pickup(&scheduler).await;
        let mut waiters = Vec::new();
        for label in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            waiters.push(scheduler.submit(OperationKind::Detach, async move {
                log.lock().unwrap().push(label);
                Ok(())
            }));
        }

        gate_tx.send(()).unwrap();
        first.await.unwrap().unwrap();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_is_delivered_only_to_its_caller() {
        let scheduler = OperationScheduler::new();

        let failing = scheduler.submit(OperationKind::Attach, async {
            Err(RoomError::Internal("failed to attach room: boom".into()))
        });
        let ok = scheduler.submit(OperationKind::Detach, async { Ok(()) });

        let err = failing.await.unwrap().unwrap_err();
        assert_eq!(err, RoomError::Internal("failed to attach room: boom".into()));
        // The failure did not stop the drain.
        assert!(ok.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_pending_jobs_counts_queued_only() {
        let scheduler = OperationScheduler::new();
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let first = scheduler.submit(OperationKind::Attach, async move {
            let _ = gate_rx.await;
            Ok(())
        });
        wait_for_pickup(&scheduler).await;
        assert!(!scheduler.finished_processing());

        let second = scheduler.submit(OperationKind::Attach, async { Ok(()) });
        assert_eq!(scheduler.pending_jobs(), 1);

        gate_tx.send(()).unwrap();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(scheduler.pending_jobs(), 0);
        assert!(scheduler.finished_processing());
    }
}
