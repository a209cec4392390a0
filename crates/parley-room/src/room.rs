//! The room facade: the caller-facing surface of one chat room.

use std::sync::Arc;

use parley_transport::ErrorInfo;
use tokio::sync::broadcast;

use crate::contributor::Contributor;
use crate::lifecycle::LifecycleCoordinator;
use crate::status::RoomStatusChange;
use crate::{LifecycleConfig, RoomError, RoomStatus};

/// A chat room: an ordered set of feature contributors whose lifecycle is
/// driven as a unit.
///
/// All lifecycle work is delegated to the room's [`LifecycleCoordinator`];
/// this type adds the room's identity and the public API shape.
pub struct Room<C: Contributor> {
    name: String,
    lifecycle: LifecycleCoordinator<C>,
}

impl<C: Contributor> Room<C> {
    /// Creates a room from an ordered contributor list.
    ///
    /// Contributor order is the order used for attach, detach, and
    /// dispose — e.g. messages, presence, typing, reactions, occupancy.
    /// Must be called within a Tokio runtime.
    pub fn new(
        name: impl Into<String>,
        contributors: Vec<Arc<C>>,
        config: LifecycleConfig,
    ) -> Self {
        let name = name.into();
        tracing::info!(room = %name, contributors = contributors.len(), "room created");
        Self {
            name,
            lifecycle: LifecycleCoordinator::new(contributors, config),
        }
    }

    /// The room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying lifecycle coordinator.
    pub fn lifecycle(&self) -> &LifecycleCoordinator<C> {
        &self.lifecycle
    }

    /// Attaches the room. See [`LifecycleCoordinator::attach`].
    pub async fn attach(&self) -> Result<(), RoomError> {
        self.lifecycle.attach().await
    }

    /// Detaches the room. See [`LifecycleCoordinator::detach`].
    pub async fn detach(&self) -> Result<(), RoomError> {
        self.lifecycle.detach().await
    }

    /// Releases the room. Never fails; idempotent.
    pub async fn release(&self) {
        self.lifecycle.release().await;
        tracing::info!(room = %self.name, "room released");
    }

    /// Resolves once the room is attached. See
    /// [`LifecycleCoordinator::ensure_attached`].
    pub async fn ensure_attached(&self) -> Result<(), RoomError> {
        self.lifecycle.ensure_attached().await
    }

    /// The room's current status.
    pub fn status(&self) -> RoomStatus {
        self.lifecycle.status()
    }

    /// The error recorded by the most recent status transition, if any.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.lifecycle.error()
    }

    /// Subscribes to room status changes.
    pub fn on_status_change(&self) -> broadcast::Receiver<RoomStatusChange> {
        self.lifecycle.on_status_change()
    }

    /// Subscribes to channel discontinuity notifications.
    pub fn on_discontinuity(&self) -> broadcast::Receiver<ErrorInfo> {
        self.lifecycle.on_discontinuity()
    }

    /// `true` once the room has reached `Attached` at least once.
    pub fn has_attached_once(&self) -> bool {
        self.lifecycle.has_attached_once()
    }

    /// `true` after a successful explicit detach.
    pub fn is_explicitly_detached(&self) -> bool {
        self.lifecycle.is_explicitly_detached()
    }

    /// Number of lifecycle operations queued behind the running one.
    pub fn pending_jobs(&self) -> usize {
        self.lifecycle.pending_jobs()
    }

    /// `true` when no lifecycle operation is running or queued.
    pub fn finished_processing(&self) -> bool {
        self.lifecycle.finished_processing()
    }
}
