//! Room lifecycle coordination for Parley.
//!
//! A room aggregates several independently-attachable features
//! (messages, presence, typing, reactions, occupancy), each bound to one
//! or more transport channels. This crate guarantees that exactly one
//! lifecycle operation is in flight at any time, that operations run in
//! a well-defined priority order, that room status moves through a fixed
//! state machine, and that transient channel failures are retried
//! without corrupting room state or deadlocking concurrent callers.
//!
//! # Key types
//!
//! - [`Room`] — the caller-facing facade
//! - [`LifecycleCoordinator`] — attach/detach/release/retry orchestration
//! - [`StatusMachine`] / [`RoomStatus`] — the status state machine
//! - [`OperationScheduler`] — the single-flight priority task queue
//! - [`Contributor`] — the feature-unit trait; [`RoomFeature`] is a
//!   ready-made implementation

mod config;
mod contributor;
mod error;
mod lifecycle;
mod room;
mod scheduler;
mod status;

pub use config::LifecycleConfig;
pub use contributor::{Contributor, RoomFeature};
pub use error::{ErrorCode, RoomError};
pub use lifecycle::LifecycleCoordinator;
pub use room::Room;
pub use scheduler::{OperationKind, OperationScheduler};
pub use status::{RoomStatus, RoomStatusChange, StatusMachine};
