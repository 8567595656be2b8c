//! EventWatcher processor.
//!
//! The EventWatcher is responsible for:
//! - Polling the event source once per tick (status, then the event document)
//! - Running the per-occurrence lifecycle state machine ([`decide`])
//! - Persisting record creation and the refresh flag
//! - Emitting `NotifyRequest` events toward the dispatcher
//!
//! One occurrence is identified by `(kind, starts_at)` and is notified at
//! most once per lifecycle stage: once on first sighting, and once more when
//! a refresh phase comes due inside the event window.

use crate::entities::{EventKind, EventNotification, NewEventNotification, NotificationStore};
use crate::events::{NotifyRequest, NotifyRequestSender, NotifyStage};
use crate::source::{EventSource, GameEvent};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How long a spawn-type occurrence must have been live before it is acted
/// on. The source announces spawns slightly ahead of time and they can still
/// shift around their start timestamp.
pub const SPAWN_GRACE_SECS: i64 = 30;

/// Occurrences first sighted later than this past their start are recorded
/// but not announced.
pub const STALE_AFTER_SECS: i64 = 300;

/// Length of the window, from event start, inside which a refresh
/// notification may still fire.
pub const EVENT_WINDOW_SECS: i64 = 3600;

/// Fixed-cadence tick source.
///
/// Wraps a tokio interval with `Delay` missed-tick behavior: a tick that runs
/// long pushes the next one out instead of letting ticks pile up, so tick
/// bodies never overlap.
pub struct PollTicker {
    interval: tokio::time::Interval,
}

impl PollTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// The lifecycle transition chosen for one occurrence on one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// No record yet, but the spawn grace period has not elapsed; re-evaluate
    /// next tick.
    WaitGrace,
    /// Create the record. `suppressed` is set when the occurrence was sighted
    /// too late to be worth announcing; the record is still persisted so it
    /// is never announced later.
    Announce { suppressed: bool, refresh_at: i64 },
    /// The refresh phase is due: mark the record and notify a second time.
    Refresh { record_id: i64 },
    /// Fully handled, nothing to do.
    Done,
}

/// Decide the lifecycle transition for one occurrence.
///
/// Pure function over the persisted record (if any), the freshly fetched
/// event, and the current time in epoch seconds.
pub fn decide(
    record: Option<&EventNotification>,
    kind: EventKind,
    event: &GameEvent,
    now: i64,
) -> TickAction {
    match record {
        None => {
            if kind.has_spawn_grace() && now < event.starts_at + SPAWN_GRACE_SECS {
                return TickAction::WaitGrace;
            }
            let refresh_at = if kind.has_refresh_phase() {
                event.refresh_at
            } else {
                0
            };
            TickAction::Announce {
                suppressed: now > event.starts_at + STALE_AFTER_SECS,
                refresh_at,
            }
        }
        Some(existing) if existing.refresh_at > 0 && !existing.refreshed => {
            let window_end = existing.starts_at + EVENT_WINDOW_SECS;
            if now >= existing.refresh_at && now >= existing.starts_at && now <= window_end {
                TickAction::Refresh {
                    record_id: existing.id,
                }
            } else {
                TickAction::Done
            }
        }
        Some(_) => TickAction::Done,
    }
}

/// EventWatcher polls the source and drives the notification lifecycle.
pub struct EventWatcher<S, N> {
    source: S,
    store: N,
    notify_tx: NotifyRequestSender,
    poll_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: EventSource, N: NotificationStore> EventWatcher<S, N> {
    /// Create a new EventWatcher.
    ///
    /// # Arguments
    ///
    /// * `source` - Event source gateway
    /// * `store` - Persistence for notification records
    /// * `notify_tx` - Sender for NotifyRequest events
    /// * `poll_interval` - Tick cadence
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        source: S,
        store: N,
        notify_tx: NotifyRequestSender,
        poll_interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            store,
            notify_tx,
            poll_interval,
            shutdown_rx,
        }
    }

    /// Run the EventWatcher until shutdown is signaled.
    pub async fn run(mut self) {
        info!("EventWatcher started");

        let mut ticker = PollTicker::new(self.poll_interval);

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("EventWatcher received shutdown signal");
                        break;
                    }
                }

                // Tick elapsed; the tick body is awaited here, so the next
                // tick cannot start before this one finishes.
                _ = ticker.tick() => {
                    let now = time::OffsetDateTime::now_utc().unix_timestamp();
                    self.poll_once(now).await;
                }
            }
        }

        info!("EventWatcher shutdown complete");
    }

    /// Process a single tick at the given time.
    ///
    /// Fetches status and the event document, then walks the event kinds in a
    /// fixed order, one complete decide-persist-notify sequence per kind.
    pub async fn poll_once(&self, now: i64) {
        let Some(status) = self.source.fetch_status().await else {
            debug!("event source unavailable, skipping tick");
            return;
        };
        if !status.available {
            debug!("event service reports unavailable, skipping tick");
            return;
        }

        let Some(events) = self.source.fetch_events().await else {
            debug!("no event document this tick");
            return;
        };

        for kind in EventKind::ALL {
            let Some(event) = events.get(&kind) else {
                continue;
            };
            self.process_kind(kind, event, now).await;
        }
    }

    async fn process_kind(&self, kind: EventKind, event: &GameEvent, now: i64) {
        let record = match self.store.find(kind, event.starts_at).await {
            Ok(record) => record,
            Err(e) => {
                error!(kind = %kind, error = %e, "failed to load notification record");
                return;
            }
        };

        match decide(record.as_ref(), kind, event, now) {
            TickAction::WaitGrace => {
                debug!(
                    kind = %kind,
                    starts_at = event.starts_at,
                    "within spawn grace period, deferring"
                );
            }
            TickAction::Announce {
                suppressed,
                refresh_at,
            } => {
                let new_record = NewEventNotification {
                    kind,
                    starts_at: event.starts_at,
                    refresh_at,
                    payload: event.payload.clone(),
                };
                // A failed write is logged and the notification still goes
                // out this tick; if the record did not stick, the occurrence
                // may be announced again next tick.
                if let Err(e) = self.store.create(&new_record).await {
                    warn!(
                        kind = %kind,
                        starts_at = event.starts_at,
                        error = %e,
                        "failed to persist notification record, announcing anyway"
                    );
                }

                if suppressed {
                    info!(
                        kind = %kind,
                        starts_at = event.starts_at,
                        "occurrence sighted too late, recorded without announcement"
                    );
                } else {
                    info!(kind = %kind, starts_at = event.starts_at, "announcing occurrence");
                    self.emit(NotifyRequest {
                        kind,
                        stage: NotifyStage::Initial,
                        event: event.clone(),
                    })
                    .await;
                }
            }
            TickAction::Refresh { record_id } => {
                if let Err(e) = self.store.mark_refreshed(record_id).await {
                    warn!(
                        kind = %kind,
                        record_id,
                        error = %e,
                        "failed to mark record refreshed, notifying anyway"
                    );
                }

                info!(kind = %kind, starts_at = event.starts_at, "refresh phase due, notifying");
                self.emit(NotifyRequest {
                    kind,
                    stage: NotifyStage::Refresh,
                    event: event.clone(),
                })
                .await;
            }
            TickAction::Done => {}
        }
    }

    async fn emit(&self, request: NotifyRequest) {
        if let Err(e) = self.notify_tx.send(request).await {
            error!(error = %e, "failed to queue notification, dispatcher gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    const T0: i64 = 1_700_000_000;

    fn event(starts_at: i64, refresh_at: i64) -> GameEvent {
        GameEvent {
            starts_at,
            refresh_at,
            payload: json!({"zone": "scosglen"}),
        }
    }

    fn record(kind: EventKind, starts_at: i64, refresh_at: i64, refreshed: bool) -> EventNotification {
        EventNotification {
            id: 7,
            kind,
            starts_at,
            refresh_at,
            refreshed,
            payload: Json(json!({})),
            created_at: time::PrimitiveDateTime::MIN,
        }
    }

    #[test]
    fn unseen_helltide_announces_with_refresh_timestamp() {
        let action = decide(None, EventKind::Helltide, &event(T0, T0 + 600), T0 + 40);
        assert_eq!(
            action,
            TickAction::Announce {
                suppressed: false,
                refresh_at: T0 + 600
            }
        );
    }

    #[test]
    fn refresh_timestamp_is_zeroed_for_kinds_without_refresh_phase() {
        let action = decide(None, EventKind::WorldBoss, &event(T0, T0 + 600), T0 + 40);
        assert_eq!(
            action,
            TickAction::Announce {
                suppressed: false,
                refresh_at: 0
            }
        );
    }

    #[test]
    fn spawn_kinds_wait_out_the_grace_period() {
        let action = decide(None, EventKind::WorldBoss, &event(T0, 0), T0 + 10);
        assert_eq!(action, TickAction::WaitGrace);

        let action = decide(None, EventKind::Legion, &event(T0, 0), T0 + SPAWN_GRACE_SECS);
        assert!(matches!(action, TickAction::Announce { .. }));
    }

    #[test]
    fn helltide_has_no_grace_period() {
        let action = decide(None, EventKind::Helltide, &event(T0, 0), T0 + 5);
        assert!(matches!(
            action,
            TickAction::Announce {
                suppressed: false,
                ..
            }
        ));
    }

    #[test]
    fn late_sighting_is_recorded_but_suppressed() {
        let action = decide(
            None,
            EventKind::Helltide,
            &event(T0, 0),
            T0 + STALE_AFTER_SECS + 1,
        );
        assert_eq!(
            action,
            TickAction::Announce {
                suppressed: true,
                refresh_at: 0
            }
        );
    }

    #[test]
    fn boundary_sighting_at_exactly_five_minutes_still_announces() {
        let action = decide(
            None,
            EventKind::Helltide,
            &event(T0, 0),
            T0 + STALE_AFTER_SECS,
        );
        assert_eq!(
            action,
            TickAction::Announce {
                suppressed: false,
                refresh_at: 0
            }
        );
    }

    #[test]
    fn refresh_fires_only_at_or_after_its_timestamp() {
        let existing = record(EventKind::Helltide, T0, T0 + 600, false);
        let helltide = event(T0, T0 + 600);

        assert_eq!(
            decide(Some(&existing), EventKind::Helltide, &helltide, T0 + 599),
            TickAction::Done
        );
        assert_eq!(
            decide(Some(&existing), EventKind::Helltide, &helltide, T0 + 600),
            TickAction::Refresh { record_id: 7 }
        );
    }

    #[test]
    fn refresh_does_not_fire_outside_the_event_window() {
        let existing = record(EventKind::Helltide, T0, T0 + 600, false);
        let helltide = event(T0, T0 + 600);

        assert_eq!(
            decide(
                Some(&existing),
                EventKind::Helltide,
                &helltide,
                T0 + EVENT_WINDOW_SECS + 1
            ),
            TickAction::Done
        );
        // The window end itself is still inside.
        assert_eq!(
            decide(
                Some(&existing),
                EventKind::Helltide,
                &helltide,
                T0 + EVENT_WINDOW_SECS
            ),
            TickAction::Refresh { record_id: 7 }
        );
    }

    #[test]
    fn refreshed_record_is_done_forever() {
        let existing = record(EventKind::Helltide, T0, T0 + 600, true);
        let action = decide(
            Some(&existing),
            EventKind::Helltide,
            &event(T0, T0 + 600),
            T0 + 700,
        );
        assert_eq!(action, TickAction::Done);
    }

    #[test]
    fn record_without_refresh_phase_is_done() {
        let existing = record(EventKind::WorldBoss, T0, 0, false);
        let action = decide(
            Some(&existing),
            EventKind::WorldBoss,
            &event(T0, 0),
            T0 + 700,
        );
        assert_eq!(action, TickAction::Done);
    }
}
