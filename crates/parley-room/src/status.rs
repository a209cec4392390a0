//! Room status state machine.
//!
//! [`StatusMachine`] holds the room's current status and error, applies
//! transitions, and fans change events out to subscribers. It deliberately
//! enforces no transition-legality table: the lifecycle coordinator is the
//! only writer and is responsible for issuing legal sequences. The machine's
//! job is atomic read/write plus notification, because status is also read
//! by code running concurrently with the single in-flight operation (e.g.
//! feature code checking whether the room is attached right now).

use std::fmt;
use std::sync::RwLock;

use parley_transport::ErrorInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// The lifecycle status of a room.
///
/// ```text
/// Initialized → Attaching → {Attached | Suspended | Failed}
/// Attached → Detaching → {Detached | Suspended | Failed}
/// any non-released state → Releasing → Released
/// ```
///
/// `Suspended` and `Failed` are re-enterable via fresh `attach()`/`detach()`
/// calls; `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Initialized,
    Attaching,
    Attached,
    Detaching,
    Detached,
    Suspended,
    Failed,
    Releasing,
    Released,
}

impl RoomStatus {
    /// Returns `true` if the room is live.
    pub fn is_attached(self) -> bool {
        matches!(self, Self::Attached)
    }

    /// Returns `true` if the room has been released (terminal).
    pub fn is_released(self) -> bool {
        matches!(self, Self::Released)
    }

    /// Returns `true` if the status is a resting point rather than an
    /// in-flight transition.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Attaching | Self::Detaching | Self::Releasing)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "Initialized",
            Self::Attaching => "Attaching",
            Self::Attached => "Attached",
            Self::Detaching => "Detaching",
            Self::Detached => "Detached",
            Self::Suspended => "Suspended",
            Self::Failed => "Failed",
            Self::Releasing => "Releasing",
            Self::Released => "Released",
        };
        write!(f, "{s}")
    }
}

/// An immutable snapshot emitted on every status transition.
///
/// `error` is set only on transitions into `Suspended`/`Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatusChange {
    /// The status the room just entered.
    pub current: RoomStatus,
    /// The status the room left.
    pub previous: RoomStatus,
    /// The error that drove the transition, if any.
    pub error: Option<ErrorInfo>,
}

struct StatusInner {
    status: RoomStatus,
    error: Option<ErrorInfo>,
}

/// Holds the current room status/error and notifies subscribers on change.
pub struct StatusMachine {
    inner: RwLock<StatusInner>,
    events: broadcast::Sender<RoomStatusChange>,
}

impl StatusMachine {
    /// Creates a machine in the `Initialized` status.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            inner: RwLock::new(StatusInner {
                status: RoomStatus::Initialized,
                error: None,
            }),
            events,
        }
    }

    /// The current status.
    pub fn status(&self) -> RoomStatus {
        self.inner.read().expect("status lock poisoned").status
    }

    /// The error recorded by the most recent transition, if any.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.inner.read().expect("status lock poisoned").error.clone()
    }

    /// Subscribes to status changes.
    ///
    /// To wait for a transition without a missed-event race, subscribe
    /// first and then re-check [`StatusMachine::status`].
    pub fn subscribe(&self) -> broadcast::Receiver<RoomStatusChange> {
        self.events.subscribe()
    }

    /// Applies a transition and notifies subscribers.
    ///
    /// Only the lifecycle coordinator calls this, and (apart from the
    /// documented release fast path on a quiescent room) only while
    /// holding the single execution slot.
    pub(crate) fn set(&self, next: RoomStatus, error: Option<ErrorInfo>) {
        let change = {
            let mut inner = self.inner.write().expect("status lock poisoned");
            let previous = inner.status;
            inner.status = next;
            inner.error = error.clone();
            RoomStatusChange {
                current: next,
                previous,
                error,
            }
        };
        tracing::debug!(
            previous = %change.previous,
            current = %change.current,
            "room status changed"
        );
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_is_initialized() {
        let machine = StatusMachine::new(8);
        assert_eq!(machine.status(), RoomStatus::Initialized);
        assert_eq!(machine.error(), None);
    }

    #[test]
    fn test_set_emits_change_with_previous() {
        let machine = StatusMachine::new(8);
        let mut events = machine.subscribe();

        machine.set(RoomStatus::Attaching, None);
        machine.set(RoomStatus::Attached, None);

        let first = events.try_recv().unwrap();
        assert_eq!(first.previous, RoomStatus::Initialized);
        assert_eq!(first.current, RoomStatus::Attaching);

        let second = events.try_recv().unwrap();
        assert_eq!(second.previous, RoomStatus::Attaching);
        assert_eq!(second.current, RoomStatus::Attached);
    }

    #[test]
    fn test_error_is_recorded_and_cleared() {
        let machine = StatusMachine::new(8);
        let info = ErrorInfo::new("failed to attach room: x", 1100, 500);

        machine.set(RoomStatus::Suspended, Some(info.clone()));
        assert_eq!(machine.error(), Some(info));

        machine.set(RoomStatus::Attaching, None);
        assert_eq!(machine.error(), None);
    }

    #[test]
    fn test_every_subscriber_observes_changes() {
        let machine = StatusMachine::new(8);
        let mut a = machine.subscribe();
        let mut b = machine.subscribe();

        machine.set(RoomStatus::Releasing, None);

        assert_eq!(a.try_recv().unwrap().current, RoomStatus::Releasing);
        assert_eq!(b.try_recv().unwrap().current, RoomStatus::Releasing);
    }

    #[test]
    fn test_status_predicates() {
        assert!(RoomStatus::Attached.is_attached());
        assert!(RoomStatus::Released.is_released());
        assert!(RoomStatus::Suspended.is_settled());
        assert!(!RoomStatus::Attaching.is_settled());
        assert!(!RoomStatus::Releasing.is_settled());
    }
}
