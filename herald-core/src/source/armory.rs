//! Armory event source.
//!
//! Fetches the current event document from a d4armory-style HTTP API and maps
//! it into the engine's event model. The API reports one upcoming-or-active
//! occurrence per kind in a single JSON document.

use super::{EventSource, GameEvent, ServiceStatus};
use crate::entities::EventKind;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// HTTP client for the armory event API.
pub struct ArmoryClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl ArmoryClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn get_status(&self) -> Result<StatusResponse, reqwest::Error> {
        let response = self
            .http_client
            .get(self.endpoint("/api/status"))
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }

    async fn get_events(&self) -> Result<EventsResponse, reqwest::Error> {
        let response = self
            .http_client
            .get(self.endpoint("/api/events"))
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }
}

#[async_trait]
impl EventSource for ArmoryClient {
    async fn fetch_status(&self) -> Option<ServiceStatus> {
        match self.get_status().await {
            Ok(status) => Some(ServiceStatus {
                available: status.available,
            }),
            Err(e) => {
                warn!(error = %e, "failed to fetch source status");
                None
            }
        }
    }

    async fn fetch_events(&self) -> Option<HashMap<EventKind, GameEvent>> {
        match self.get_events().await {
            Ok(document) => Some(map_events(document)),
            Err(e) => {
                warn!(error = %e, "failed to fetch event document");
                None
            }
        }
    }
}

/// Map the source document into the engine's event model.
///
/// Kinds absent from the document are simply not reported this tick.
fn map_events(document: EventsResponse) -> HashMap<EventKind, GameEvent> {
    let mut events = HashMap::new();

    if let Some(helltide) = document.helltide {
        events.insert(
            EventKind::Helltide,
            GameEvent {
                starts_at: helltide.timestamp,
                refresh_at: helltide.refresh,
                payload: json!({ "zone": helltide.zone }),
            },
        );
    }

    if let Some(boss) = document.boss {
        events.insert(
            EventKind::WorldBoss,
            GameEvent {
                starts_at: boss.timestamp,
                refresh_at: 0,
                payload: json!({
                    "name": boss.name,
                    "zone": boss.zone,
                    "territory": boss.territory,
                }),
            },
        );
    }

    if let Some(legion) = document.legion {
        events.insert(
            EventKind::Legion,
            GameEvent {
                starts_at: legion.timestamp,
                refresh_at: 0,
                payload: json!({
                    "zone": legion.zone,
                    "territory": legion.territory,
                }),
            },
        );
    }

    events
}

// API response types for the armory document.

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct StatusResponse {
    #[serde(default)]
    available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct EventsResponse {
    #[serde(default)]
    boss: Option<BossEvent>,
    #[serde(default)]
    helltide: Option<HelltideEvent>,
    #[serde(default)]
    legion: Option<LegionEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct BossEvent {
    timestamp: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    territory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct HelltideEvent {
    timestamp: i64,
    #[serde(default)]
    refresh: i64,
    #[serde(default)]
    zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct LegionEvent {
    timestamp: i64,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    territory: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_and_maps_full_document() {
        let raw = r#"
        {
            "boss": {
                "name": "Ashava",
                "timestamp": 1700000300,
                "territory": "The Crucible",
                "zone": "kehjistan"
            },
            "helltide": {
                "timestamp": 1700000000,
                "refresh": 1700000600,
                "zone": "scosglen"
            },
            "legion": {
                "timestamp": 1700000100,
                "territory": "Carrowcrest Ruins",
                "zone": "scosglen"
            }
        }
        "#;

        let document: EventsResponse = serde_json::from_str(raw).unwrap();
        let events = map_events(document);

        assert_eq!(events.len(), 3);

        let helltide = &events[&EventKind::Helltide];
        assert_eq!(helltide.starts_at, 1_700_000_000);
        assert_eq!(helltide.refresh_at, 1_700_000_600);
        assert_eq!(helltide.payload["zone"], "scosglen");

        let boss = &events[&EventKind::WorldBoss];
        assert_eq!(boss.refresh_at, 0);
        assert_eq!(boss.payload["name"], "Ashava");
    }

    #[test]
    fn missing_sections_are_not_reported() {
        let document: EventsResponse =
            serde_json::from_str(r#"{"helltide": {"timestamp": 10, "zone": "hawezar"}}"#).unwrap();
        let events = map_events(document);

        assert_eq!(events.len(), 1);
        // No refresh field in the document means no refresh phase.
        assert_eq!(events[&EventKind::Helltide].refresh_at, 0);
        assert!(!events.contains_key(&EventKind::WorldBoss));
    }

    #[test]
    fn status_defaults_to_unavailable() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(!status.available);
    }
}
