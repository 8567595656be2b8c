//! The world-event source.
//!
//! The source is a read-only collaborator: two fetches per tick, no retries.
//! Failures surface as `None` and the caller skips the tick for that data;
//! the next tick simply fetches again.

pub mod armory;

use crate::entities::EventKind;
use async_trait::async_trait;
use std::collections::HashMap;

/// Whether the upstream event service considers itself usable this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub available: bool,
}

/// One occurrence of a world event as reported by the source.
///
/// Reconstructed from the source each tick; identity is `(kind, starts_at)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    /// Event start, epoch seconds.
    pub starts_at: i64,
    /// When the second notification should fire, epoch seconds. Zero means
    /// the event has no refresh phase.
    pub refresh_at: i64,
    /// Opaque display fields (zone, boss name, ...) passed through to the
    /// renderer untouched.
    pub payload: serde_json::Value,
}

/// Read-only gateway to the event source.
///
/// Both calls are side-effect free and report failure as `None` rather than
/// an error; implementations log the cause themselves.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_status(&self) -> Option<ServiceStatus>;

    async fn fetch_events(&self) -> Option<HashMap<EventKind, GameEvent>>;
}

pub use armory::ArmoryClient;
