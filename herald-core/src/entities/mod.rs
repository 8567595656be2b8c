pub mod event_notification;
pub mod guild_settings;

use thiserror::Error;

/// World event kind for database operations and event routing.
///
/// The set is fixed: these are the three timed events the source API reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "event_kind")]
pub enum EventKind {
    Helltide,
    WorldBoss,
    Legion,
}

impl EventKind {
    /// All kinds, in the order they are processed within a tick.
    pub const ALL: [EventKind; 3] = [EventKind::Helltide, EventKind::WorldBoss, EventKind::Legion];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Helltide => "helltide",
            EventKind::WorldBoss => "worldboss",
            EventKind::Legion => "legion",
        }
    }

    /// Whether this kind carries a mid-event refresh phase (a second
    /// notification, e.g. the Helltide chest reset).
    pub fn has_refresh_phase(self) -> bool {
        matches!(self, EventKind::Helltide)
    }

    /// Whether this kind must have been live for [`SPAWN_GRACE_SECS`] before
    /// the first notification fires. Spawn-type events are announced ahead of
    /// time by the source and can still shift or vanish right around their
    /// start timestamp.
    ///
    /// [`SPAWN_GRACE_SECS`]: crate::processors::event_watcher::SPAWN_GRACE_SECS
    pub fn has_spawn_grace(self) -> bool {
        matches!(self, EventKind::WorldBoss | EventKind::Legion)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the persistence stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub use event_notification::{
    EventNotification, NewEventNotification, NotificationStore, PgNotificationStore,
};
pub use guild_settings::{DeliverySetting, GuildSubscriber, PgSubscriberStore, SubscriberStore};
