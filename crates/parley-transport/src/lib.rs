//! Transport channel abstraction for Parley.
//!
//! Provides the [`ChannelHandle`] trait that abstracts over pub/sub
//! transport channels, plus the state and error vocabulary the room
//! lifecycle layer consumes.
//!
//! The room layer never drives a connection itself — it only calls
//! `attach`/`detach` on channels, observes the states the transport
//! reports, and reacts. Reconnection policy, wire protocol, and message
//! payloads all live behind this boundary.

mod error;
mod local;

pub use error::{ChannelError, ErrorInfo};
pub use local::LocalChannel;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The state of a transport channel, as observed by the room layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Attaching,
    Attached,
    Detaching,
    Detached,
    /// Recoverable failure — the transport retries on its own.
    Suspended,
    /// Terminal failure — requires explicit caller intervention.
    Failed,
}

/// Classification of a channel's state after a failed attach/detach,
/// used by the room layer to decide between `Suspended` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The channel is suspended — transient, the transport will recover.
    Suspended,
    /// The channel is definitively failed.
    Failed,
    /// Any other state. Treated as failed by lifecycle classification.
    Other,
}

impl ChannelState {
    /// Returns `true` if the channel is live.
    pub fn is_attached(self) -> bool {
        matches!(self, Self::Attached)
    }

    /// Returns `true` if the channel has settled far enough for a room
    /// release to complete: detached cleanly, or failed (no longer
    /// attached in any retryable sense).
    pub fn is_settled_for_release(self) -> bool {
        matches!(self, Self::Detached | Self::Failed)
    }

    /// Classifies this state for failure handling.
    pub fn outcome(self) -> ChannelOutcome {
        match self {
            Self::Suspended => ChannelOutcome::Suspended,
            Self::Failed => ChannelOutcome::Failed,
            _ => ChannelOutcome::Other,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Attaching => "attaching",
            Self::Attached => "attached",
            Self::Detaching => "detaching",
            Self::Detached => "detached",
            Self::Suspended => "suspended",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Capability surface of a single transport channel.
///
/// The async methods are declared as explicit `impl Future + Send` so that
/// code generic over a `ChannelHandle` can be boxed into `Send` task
/// bodies (the room scheduler runs operations on a spawned worker).
///
/// Implementations publish state transitions through a [`watch`] channel;
/// [`ChannelHandle::state_changes`] hands out a receiver whose current
/// value is always the latest state, so waiters never miss a transition
/// that happened before they subscribed.
pub trait ChannelHandle: Send + Sync + 'static {
    /// The channel's unique name, e.g. `"1234::$chat"`.
    fn name(&self) -> &str;

    /// Starts live delivery on this channel.
    fn attach(&self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Stops live delivery on this channel.
    fn detach(&self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// The channel's current state.
    fn state(&self) -> ChannelState;

    /// The most recent error reported by the transport, if any.
    fn last_error(&self) -> Option<ErrorInfo>;

    /// Subscribes to channel state transitions.
    fn state_changes(&self) -> watch::Receiver<ChannelState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(ChannelState::Suspended.outcome(), ChannelOutcome::Suspended);
        assert_eq!(ChannelState::Failed.outcome(), ChannelOutcome::Failed);
        assert_eq!(ChannelState::Attached.outcome(), ChannelOutcome::Other);
        assert_eq!(ChannelState::Detaching.outcome(), ChannelOutcome::Other);
    }

    #[test]
    fn test_settled_for_release() {
        assert!(ChannelState::Detached.is_settled_for_release());
        assert!(ChannelState::Failed.is_settled_for_release());
        assert!(!ChannelState::Attached.is_settled_for_release());
        assert!(!ChannelState::Suspended.is_settled_for_release());
    }

    #[test]
    fn test_channel_state_display() {
        assert_eq!(ChannelState::Attached.to_string(), "attached");
        assert_eq!(ChannelState::Suspended.to_string(), "suspended");
    }
}
