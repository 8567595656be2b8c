//! Notification records — one row per announced event occurrence.
//!
//! A record exists once an occurrence has been handled (announced, or sighted
//! too late and deliberately recorded without an announcement). The
//! `(kind, starts_at)` pair is unique; `refreshed` only ever moves
//! false -> true.

use super::{EventKind, StoreError};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventNotification {
    pub id: i64,
    pub kind: EventKind,
    /// Event start, epoch seconds.
    pub starts_at: i64,
    /// When the second notification becomes due, epoch seconds. Zero means
    /// the occurrence has no refresh phase.
    pub refresh_at: i64,
    pub refreshed: bool,
    pub payload: Json<serde_json::Value>,
    pub created_at: time::PrimitiveDateTime,
}

/// Insert payload for a new notification record.
#[derive(Debug, Clone)]
pub struct NewEventNotification {
    pub kind: EventKind,
    pub starts_at: i64,
    pub refresh_at: i64,
    pub payload: serde_json::Value,
}

/// Persistence seam for notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Look up the record for one occurrence.
    async fn find(
        &self,
        kind: EventKind,
        starts_at: i64,
    ) -> Result<Option<EventNotification>, StoreError>;

    /// Create the record for an occurrence. Creating the same occurrence
    /// twice is a no-op.
    async fn create(&self, record: &NewEventNotification) -> Result<(), StoreError>;

    /// Mark the occurrence's refresh notification as sent.
    async fn mark_refreshed(&self, id: i64) -> Result<(), StoreError>;
}

/// Postgres-backed [`NotificationStore`] over the `event_notifications` table.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn find(
        &self,
        kind: EventKind,
        starts_at: i64,
    ) -> Result<Option<EventNotification>, StoreError> {
        let record = sqlx::query_as::<_, EventNotification>(
            r#"
            SELECT id, kind, starts_at, refresh_at, refreshed, payload, created_at
            FROM event_notifications
            WHERE kind = $1 AND starts_at = $2
            "#,
        )
        .bind(kind)
        .bind(starts_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn create(&self, record: &NewEventNotification) -> Result<(), StoreError> {
        // ON CONFLICT DO NOTHING keeps creation idempotent per occurrence.
        sqlx::query(
            r#"
            INSERT INTO event_notifications (kind, starts_at, refresh_at, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, starts_at) DO NOTHING
            "#,
        )
        .bind(record.kind)
        .bind(record.starts_at)
        .bind(record.refresh_at)
        .bind(Json(&record.payload))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_refreshed(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE event_notifications SET refreshed = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
