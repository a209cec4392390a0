//! End-to-end lifecycle demo: a five-feature chat room over an in-process
//! channel, driven through a full attach → detach → re-attach → release
//! cycle.
//!
//! Run with `RUST_LOG=debug cargo run -p lobby` to watch the status
//! machine and scheduler at work.

use std::sync::Arc;

use parley_room::{LifecycleConfig, Room, RoomFeature};
use parley_transport::LocalChannel;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,parley_room=debug")),
        )
        .init();

    // All five features share one underlying channel here; the
    // coordinator is agnostic either way.
    let channel = Arc::new(LocalChannel::new("lobby::$chat"));
    let features = ["messages", "presence", "typing", "reactions", "occupancy"]
        .map(|name| Arc::new(RoomFeature::new(name, Arc::clone(&channel))));

    let room = Room::new("lobby", features.to_vec(), LifecycleConfig::default());

    let mut events = room.on_status_change();
    let watcher = tokio::spawn(async move {
        while let Ok(change) = events.recv().await {
            tracing::info!(
                previous = %change.previous,
                current = %change.current,
                "room status"
            );
        }
    });

    room.attach().await.expect("attach failed");
    room.ensure_attached()
        .await
        .expect("room should be attached");

    room.detach().await.expect("detach failed");
    room.attach().await.expect("re-attach failed");
    room.release().await;

    tracing::info!(status = %room.status(), "done");
    drop(room);
    let _ = watcher.await;
}
