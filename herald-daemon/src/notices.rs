//! Plain-text notice rendering.
//!
//! Produces the message body for each event kind from the opaque payload
//! fields the source reported. Currently English-only; the locale is accepted
//! so per-guild languages can be added without touching the dispatcher.

use herald_core::entities::EventKind;
use herald_core::processors::NoticeRenderer;
use herald_core::source::GameEvent;

pub struct PlainRenderer;

impl PlainRenderer {
    fn payload_str<'a>(event: &'a GameEvent, field: &str, fallback: &'a str) -> &'a str {
        event
            .payload
            .get(field)
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
    }
}

impl NoticeRenderer for PlainRenderer {
    fn render(&self, kind: EventKind, event: &GameEvent, _locale: &str) -> String {
        match kind {
            EventKind::Helltide => {
                let zone = Self::payload_str(event, "zone", "Sanctuary");
                format!("A Helltide surges through {zone}! It burns out <t:{}:R>.", event.starts_at + 3600)
            }
            EventKind::WorldBoss => {
                let name = Self::payload_str(event, "name", "A world boss");
                let territory = Self::payload_str(event, "territory", "an unknown territory");
                format!("{name} has spawned in {territory}!")
            }
            EventKind::Legion => {
                let territory = Self::payload_str(event, "territory", "an unknown territory");
                format!("A Legion gathering begins in {territory}!")
            }
        }
    }
}
