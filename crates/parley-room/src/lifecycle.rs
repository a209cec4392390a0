//! Lifecycle coordination: attach, detach, release, and windowed recovery.
//!
//! [`LifecycleCoordinator`] orchestrates every lifecycle operation of a
//! room. Each public call either resolves through a fast-path check
//! against the current status, or is wrapped as a prioritized task and
//! submitted to the room's [`OperationScheduler`] — so exactly one
//! operation body touches channels and mutates status at any time.
//!
//! The coordinator is a cheap-to-clone handle over shared state, like the
//! rest of this workspace's actor handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parley_transport::{ChannelError, ChannelHandle, ChannelOutcome, ChannelState, ErrorInfo};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::contributor::Contributor;
use crate::scheduler::{OperationKind, OperationScheduler};
use crate::status::{RoomStatusChange, StatusMachine};
use crate::{LifecycleConfig, RoomError, RoomStatus};

/// Coordinates the lifecycle of one room.
///
/// Cloning is cheap; all clones drive the same room.
pub struct LifecycleCoordinator<C: Contributor> {
    inner: Arc<LifecycleInner<C>>,
}

impl<C: Contributor> Clone for LifecycleCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct LifecycleInner<C: Contributor> {
    status: StatusMachine,
    scheduler: OperationScheduler,
    /// Ordered feature list. Order matters for deterministic release.
    contributors: Vec<Arc<C>>,
    config: LifecycleConfig,
    has_attached_once: AtomicBool,
    explicitly_detached: AtomicBool,
    disposed: AtomicBool,
    discontinuity: broadcast::Sender<ErrorInfo>,
}

impl<C: Contributor> LifecycleCoordinator<C> {
    /// Creates a coordinator for the given ordered contributor list.
    ///
    /// Must be called within a Tokio runtime (the scheduler spawns its
    /// worker task here).
    pub fn new(contributors: Vec<Arc<C>>, config: LifecycleConfig) -> Self {
        let (discontinuity, _) = broadcast::channel(config.discontinuity_event_capacity);
        Self {
            inner: Arc::new(LifecycleInner {
                status: StatusMachine::new(config.status_event_capacity),
                scheduler: OperationScheduler::new(),
                contributors,
                config,
                has_attached_once: AtomicBool::new(false),
                explicitly_detached: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                discontinuity,
            }),
        }
    }

    /// The room's current status.
    pub fn status(&self) -> RoomStatus {
        self.inner.status.status()
    }

    /// The error recorded by the most recent status transition, if any.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.inner.status.error()
    }

    /// Subscribes to room status changes.
    pub fn on_status_change(&self) -> broadcast::Receiver<RoomStatusChange> {
        self.inner.status.subscribe()
    }

    /// Subscribes to channel discontinuity notifications.
    pub fn on_discontinuity(&self) -> broadcast::Receiver<ErrorInfo> {
        self.inner.discontinuity.subscribe()
    }

    /// Forwards a resume-failure signal from a contributor's channel to
    /// discontinuity subscribers.
    pub fn emit_discontinuity(&self, error: ErrorInfo) {
        let _ = self.inner.discontinuity.send(error);
    }

    /// `true` once the room has reached `Attached` at least once.
    pub fn has_attached_once(&self) -> bool {
        self.inner.has_attached_once.load(Ordering::SeqCst)
    }

    /// `true` after a successful explicit `detach()` (cleared by a
    /// successful `attach()`).
    pub fn is_explicitly_detached(&self) -> bool {
        self.inner.explicitly_detached.load(Ordering::SeqCst)
    }

    /// Number of lifecycle operations queued behind the running one.
    pub fn pending_jobs(&self) -> usize {
        self.inner.scheduler.pending_jobs()
    }

    /// `true` when no lifecycle operation is running or queued.
    pub fn finished_processing(&self) -> bool {
        self.inner.scheduler.finished_processing()
    }

    /// Attaches the room: attaches every contributor's channel, in order.
    ///
    /// Returns immediately if the room is already `Attached`; fails
    /// immediately with [`RoomError::Released`] if it has been released.
    /// Otherwise the attach is scheduled and evaluated against whatever
    /// status the room has once it reaches the front of the queue.
    pub async fn attach(&self) -> Result<(), RoomError> {
        match self.status() {
            RoomStatus::Attached => return Ok(()),
            RoomStatus::Released => return Err(RoomError::Released),
            _ => {}
        }
        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .run(OperationKind::Attach, async move { inner.apply_attach().await })
            .await
    }

    /// Detaches the room: detaches every contributor's channel, in order.
    pub async fn detach(&self) -> Result<(), RoomError> {
        match self.status() {
            RoomStatus::Detached => return Ok(()),
            RoomStatus::Released => return Err(RoomError::Released),
            RoomStatus::Failed => return Err(RoomError::InFailedState),
            _ => {}
        }
        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .run(OperationKind::Detach, async move { inner.apply_detach().await })
            .await
    }

    /// Releases the room. Never fails; idempotent.
    ///
    /// If nothing is attached (`Initialized`/`Detached`), the room moves
    /// straight to `Released` without touching any channel. Otherwise a
    /// release operation is scheduled at elevated priority: it detaches
    /// each channel until the channel settles (`detached` or `failed`,
    /// retrying on a fixed interval), disposes every contributor exactly
    /// once, and transitions to `Released`.
    pub async fn release(&self) {
        match self.status() {
            RoomStatus::Released => return,
            RoomStatus::Initialized | RoomStatus::Detached => {
                // Quiescent room: nothing in flight, no channel work needed.
                self.inner.status.set(RoomStatus::Released, None);
                self.inner.dispose_contributors();
                return;
            }
            _ => {}
        }
        let inner = Arc::clone(&self.inner);
        let _ = self
            .inner
            .scheduler
            .run(OperationKind::Release, async move {
                inner.apply_release().await;
                Ok(())
            })
            .await;
    }

    /// Windowed recovery for a contributor whose channel independently
    /// entered a failed/suspended condition: winds down every other
    /// contributor, waits for the triggering channel to recover (or
    /// definitively fail) on its own, then re-attaches the others.
    ///
    /// Failures surface as a room transition to `Failed`; the returned
    /// error only reaches internal recovery machinery.
    pub async fn retry(&self, contributor: &Arc<C>) -> Result<(), RoomError> {
        let target = Arc::clone(contributor);
        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .run(OperationKind::Retry, async move { inner.apply_retry(&target).await })
            .await
    }

    /// Resolves once the room is attached, without scheduling anything.
    ///
    /// If an attach is currently in flight, waits for it to settle; any
    /// other non-attached status is an immediate
    /// [`RoomError::InvalidState`].
    pub async fn ensure_attached(&self) -> Result<(), RoomError> {
        // Subscribe before reading so a transition between the read and
        // the wait cannot be missed.
        let mut events = self.inner.status.subscribe();
        match self.status() {
            RoomStatus::Attached => Ok(()),
            RoomStatus::Attaching => loop {
                match events.recv().await {
                    Ok(change) => match change.current {
                        RoomStatus::Attached => return Ok(()),
                        RoomStatus::Attaching => continue,
                        other => return Err(RoomError::InvalidState(other)),
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Too far behind; settle against the live status.
                        let status = self.status();
                        if status == RoomStatus::Attached {
                            return Ok(());
                        }
                        return Err(RoomError::InvalidState(status));
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RoomError::InvalidState(self.status()));
                    }
                }
            },
            other => Err(RoomError::InvalidState(other)),
        }
    }
}

impl<C: Contributor> LifecycleInner<C> {
    async fn apply_attach(&self) -> Result<(), RoomError> {
        // Status may have changed while this was queued.
        if self.status.status() == RoomStatus::Released {
            return Err(RoomError::Released);
        }

        self.status.set(RoomStatus::Attaching, None);
        for contributor in &self.contributors {
            if let Err(err) = contributor.channel().attach().await {
                return Err(self.classify_channel_failure(contributor, "attach", err));
            }
        }
        self.status.set(RoomStatus::Attached, None);
        self.has_attached_once.store(true, Ordering::SeqCst);
        self.explicitly_detached.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn apply_detach(&self) -> Result<(), RoomError> {
        match self.status.status() {
            RoomStatus::Released => return Err(RoomError::Released),
            RoomStatus::Failed => return Err(RoomError::InFailedState),
            _ => {}
        }

        self.status.set(RoomStatus::Detaching, None);
        for contributor in &self.contributors {
            if let Err(err) = contributor.channel().detach().await {
                return Err(self.classify_channel_failure(contributor, "detach", err));
            }
        }
        self.status.set(RoomStatus::Detached, None);
        self.explicitly_detached.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn apply_release(&self) {
        // A second queued release finds the work already done.
        if self.status.status() == RoomStatus::Released {
            return;
        }

        self.status.set(RoomStatus::Releasing, None);
        for contributor in &self.contributors {
            self.detach_until_settled(contributor).await;
        }
        self.dispose_contributors();
        self.status.set(RoomStatus::Released, None);
    }

    /// Detaches one contributor's channel until it settles. A channel
    /// ending up `failed` is an acceptable terminal outcome for release —
    /// it is no longer attached in any retryable sense.
    async fn detach_until_settled(&self, contributor: &Arc<C>) {
        loop {
            match contributor.channel().detach().await {
                Ok(()) => return,
                Err(err) => {
                    let state = contributor.channel().state();
                    if state.is_settled_for_release() {
                        tracing::debug!(
                            feature = contributor.name(),
                            %state,
                            "channel settled during release"
                        );
                        return;
                    }
                    tracing::debug!(
                        feature = contributor.name(),
                        %state,
                        error = %err,
                        "channel detach failed during release, retrying"
                    );
                    sleep(self.config.release_retry_interval).await;
                }
            }
        }
    }

    async fn apply_retry(&self, target: &Arc<C>) -> Result<(), RoomError> {
        // Wind down everything except the triggering contributor.
        for contributor in self.others(target) {
            if let Err(err) = contributor.channel().detach().await {
                if contributor.channel().state() == ChannelState::Failed {
                    let error =
                        RoomError::Internal(format!("failed to detach room: {err}"));
                    tracing::error!(
                        feature = contributor.name(),
                        error = %err,
                        "channel failed while winding down for recovery"
                    );
                    self.status.set(RoomStatus::Failed, Some(error.error_info()));
                    return Err(error);
                }
                // Non-terminal wind-down failure: the transport keeps
                // resolving the channel on its own.
                tracing::debug!(
                    feature = contributor.name(),
                    error = %err,
                    "wind-down detach failed, continuing"
                );
            }
        }

        // Wait for the triggering channel to recover or definitively fail.
        let mut states = target.channel().state_changes();
        let settled = match states
            .wait_for(|state| {
                matches!(state, ChannelState::Attached | ChannelState::Failed)
            })
            .await
        {
            Ok(state) => *state,
            Err(_) => {
                let error = RoomError::Internal(format!(
                    "failed to attach room: channel {} closed during recovery",
                    target.channel().name()
                ));
                self.status.set(RoomStatus::Failed, Some(error.error_info()));
                return Err(error);
            }
        };

        if settled == ChannelState::Failed {
            let cause = target
                .channel()
                .last_error()
                .map(|info| info.message)
                .unwrap_or_else(|| {
                    format!("channel {} failed", target.channel().name())
                });
            let error = RoomError::Internal(format!("failed to attach room: {cause}"));
            self.status.set(RoomStatus::Failed, Some(error.error_info()));
            return Err(error);
        }

        // The window reopened: bring the others back.
        for contributor in self.others(target) {
            if let Err(err) = contributor.channel().attach().await {
                return Err(self.classify_channel_failure(contributor, "attach", err));
            }
        }
        self.status.set(RoomStatus::Attached, None);
        Ok(())
    }

    /// Wraps a failed channel call and drives the room into `Suspended`
    /// or `Failed` depending on where the channel ended up.
    fn classify_channel_failure(
        &self,
        contributor: &Arc<C>,
        verb: &str,
        err: ChannelError,
    ) -> RoomError {
        let error = RoomError::Internal(format!("failed to {verb} room: {err}"));
        let info = error.error_info();
        match contributor.channel().state().outcome() {
            ChannelOutcome::Suspended => {
                tracing::warn!(
                    feature = contributor.name(),
                    channel = contributor.channel().name(),
                    error = %err,
                    "channel suspended, room suspended"
                );
                self.status.set(RoomStatus::Suspended, Some(info));
            }
            ChannelOutcome::Failed | ChannelOutcome::Other => {
                tracing::error!(
                    feature = contributor.name(),
                    channel = contributor.channel().name(),
                    error = %err,
                    "channel failed, room failed"
                );
                self.status.set(RoomStatus::Failed, Some(info));
            }
        }
        error
    }

    fn dispose_contributors(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for contributor in &self.contributors {
            tracing::debug!(feature = contributor.name(), "disposing contributor");
            contributor.dispose();
        }
    }

    fn others<'a>(&'a self, target: &'a Arc<C>) -> impl Iterator<Item = &'a Arc<C>> {
        self.contributors
            .iter()
            .filter(move |contributor| !Arc::ptr_eq(contributor, target))
    }
}
