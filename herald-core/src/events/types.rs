//! Event type definitions for the notification pipeline.

use crate::entities::EventKind;
use crate::source::GameEvent;

/// Which lifecycle stage a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStage {
    /// First sighting of an occurrence.
    Initial,
    /// The occurrence's mid-event refresh phase.
    Refresh,
}

/// A broadcast order from the lifecycle tracker to the dispatcher.
///
/// Carries the event snapshot the decision was made on so the dispatcher
/// renders exactly what the watcher saw, even if the source has moved on by
/// the time the request is consumed.
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    pub kind: EventKind,
    pub stage: NotifyStage,
    pub event: GameEvent,
}
