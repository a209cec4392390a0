//! An in-process channel implementation.
//!
//! [`LocalChannel`] never talks to a network: `attach`/`detach` succeed
//! immediately and simply publish the corresponding state. It exists for
//! demos, doctests, and downstream test harnesses that need a working
//! [`ChannelHandle`] without a transport. External conditions (a
//! transport-driven suspension or failure) are simulated through
//! [`LocalChannel::transition`] and [`LocalChannel::fail`].

use std::sync::Mutex;

use tokio::sync::watch;

use crate::{ChannelError, ChannelHandle, ChannelState, ErrorInfo};

/// A loopback channel that always attaches and detaches successfully.
pub struct LocalChannel {
    name: String,
    state: watch::Sender<ChannelState>,
    last_error: Mutex<Option<ErrorInfo>>,
}

impl LocalChannel {
    /// Creates a new detached channel with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ChannelState::Detached);
        Self {
            name: name.into(),
            state,
            last_error: Mutex::new(None),
        }
    }

    /// Simulates a transport-driven state transition.
    pub fn transition(&self, state: ChannelState) {
        tracing::debug!(channel = %self.name, %state, "local channel transition");
        self.state.send_replace(state);
    }

    /// Simulates a transport-reported failure: records the error and
    /// moves the channel to [`ChannelState::Failed`].
    pub fn fail(&self, error: ErrorInfo) {
        *self.last_error.lock().expect("last_error lock poisoned") = Some(error);
        self.transition(ChannelState::Failed);
    }
}

impl ChannelHandle for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attach(&self) -> Result<(), ChannelError> {
        self.state.send_replace(ChannelState::Attaching);
        self.state.send_replace(ChannelState::Attached);
        Ok(())
    }

    async fn detach(&self) -> Result<(), ChannelError> {
        self.state.send_replace(ChannelState::Detaching);
        self.state.send_replace(ChannelState::Detached);
        Ok(())
    }

    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn last_error(&self) -> Option<ErrorInfo> {
        self.last_error.lock().expect("last_error lock poisoned").clone()
    }

    fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_channel_attach_detach() {
        let ch = LocalChannel::new("room-1::$chat");
        assert_eq!(ch.state(), ChannelState::Detached);

        ch.attach().await.unwrap();
        assert_eq!(ch.state(), ChannelState::Attached);

        ch.detach().await.unwrap();
        assert_eq!(ch.state(), ChannelState::Detached);
    }

    #[tokio::test]
    async fn test_local_channel_fail_records_error() {
        let ch = LocalChannel::new("room-1::$chat");
        ch.fail(ErrorInfo::new("resume failed", 50000, 500));

        assert_eq!(ch.state(), ChannelState::Failed);
        assert_eq!(ch.last_error().unwrap().message, "resume failed");
    }

    #[tokio::test]
    async fn test_state_changes_sees_current_value() {
        let ch = LocalChannel::new("room-1::$chat");
        ch.attach().await.unwrap();

        // A subscriber created after the transition still observes it.
        let rx = ch.state_changes();
        assert_eq!(*rx.borrow(), ChannelState::Attached);
    }
}
