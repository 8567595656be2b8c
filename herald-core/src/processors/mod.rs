//! Event processors for the notification pipeline.
//!
//! - `EventWatcher`: polls the source on a fixed cadence, runs the lifecycle
//!   state machine per event kind, emits `NotifyRequest`
//! - `Dispatcher`: receives `NotifyRequest`, fans it out to subscribed guilds

pub mod dispatcher;
pub mod event_watcher;

pub use dispatcher::{Dispatcher, NoticeRenderer, build_notice};
pub use event_watcher::{EventWatcher, PollTicker, TickAction, decide};
