//! Room feature contributors.
//!
//! A contributor is a named feature unit (messages, presence, typing,
//! reactions, occupancy) that owns a reference to the transport channel it
//! delivers through. The lifecycle coordinator iterates the room's ordered
//! contributor list when attaching, detaching, and releasing; it is
//! agnostic to whether contributors share one underlying channel or each
//! own a distinct one.

use std::sync::Arc;

use parley_transport::ChannelHandle;

/// A named room feature bound to a transport channel.
///
/// `dispose` releases feature-owned resources and is called exactly once,
/// during a successful room release.
pub trait Contributor: Send + Sync + 'static {
    /// The transport channel type this feature is bound to.
    type Channel: ChannelHandle;

    /// The feature name, e.g. `"messages"`.
    fn name(&self) -> &str;

    /// The channel this feature delivers through.
    fn channel(&self) -> &Self::Channel;

    /// Releases feature-owned resources.
    fn dispose(&self);
}

/// A ready-made contributor for features with no teardown logic beyond an
/// optional hook.
pub struct RoomFeature<C: ChannelHandle> {
    name: String,
    channel: Arc<C>,
    on_dispose: Option<Box<dyn Fn() + Send + Sync>>,
}

impl<C: ChannelHandle> RoomFeature<C> {
    /// Creates a feature bound to a (possibly shared) channel.
    pub fn new(name: impl Into<String>, channel: Arc<C>) -> Self {
        Self {
            name: name.into(),
            channel,
            on_dispose: None,
        }
    }

    /// Adds a hook invoked when the feature is disposed.
    pub fn with_dispose(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }
}

impl<C: ChannelHandle> Contributor for RoomFeature<C> {
    type Channel = C;

    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self) -> &C {
        &self.channel
    }

    fn dispose(&self) {
        tracing::debug!(feature = %self.name, "feature disposed");
        if let Some(hook) = &self.on_dispose {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parley_transport::LocalChannel;

    #[tokio::test]
    async fn test_room_feature_shares_channel() {
        let channel = Arc::new(LocalChannel::new("42::$chat"));
        let messages = RoomFeature::new("messages", Arc::clone(&channel));
        let typing = RoomFeature::new("typing", Arc::clone(&channel));

        assert_eq!(messages.name(), "messages");
        assert_eq!(typing.channel().name(), "42::$chat");
        assert!(std::ptr::eq(messages.channel(), typing.channel()));
    }

    #[tokio::test]
    async fn test_dispose_hook_runs() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let channel = Arc::new(LocalChannel::new("42::$chat"));
        let feature = {
            let disposed = Arc::clone(&disposed);
            RoomFeature::new("presence", channel)
                .with_dispose(move || {
                    disposed.fetch_add(1, Ordering::SeqCst);
                })
        };

        feature.dispose();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }
}
