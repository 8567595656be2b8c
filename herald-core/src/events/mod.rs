//! Event system for the notification pipeline.
//!
//! # Event Flow
//!
//! 1. `EventWatcher` polls the source on a fixed cadence and runs the
//!    lifecycle state machine per event kind
//! 2. A deciding transition emits a `NotifyRequest` -> `Dispatcher`
//! 3. `Dispatcher` fans the request out to every subscribed guild
//!
//! Requests are ephemeral: they carry the event snapshot the watcher decided
//! on, and the dispatcher re-reads subscriber state from the database.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, NotifyRequestReceiver, NotifyRequestSender, notify_request_channel,
};
pub use types::{NotifyRequest, NotifyStage};
