//! Guild subscription settings.
//!
//! Guilds configure, per event kind, a target channel, an optional role to
//! mention, and keep the id of the last message the dispatcher sent so later
//! notifications can edit it in place. The settings are owned by whatever
//! manages guild configuration; this core only reads them and writes back
//! `last_message_id` after a successful delivery.

use super::{EventKind, StoreError};
use async_trait::async_trait;
use compact_str::CompactString;
use sqlx::PgPool;

/// A guild together with its delivery settings for one event kind.
#[derive(Debug, Clone)]
pub struct GuildSubscriber {
    pub guild_id: i64,
    pub locale: CompactString,
    pub settings: Vec<DeliverySetting>,
}

/// One per-kind delivery configuration of a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySetting {
    pub kind: EventKind,
    /// Target channel. Absent means the guild enabled the kind but never
    /// picked a channel; such settings are skipped.
    pub channel_id: Option<i64>,
    /// Role to mention beneath the notice text.
    pub mention_role: Option<i64>,
    /// Id of the last message sent for this setting, for edit-in-place.
    pub last_message_id: Option<i64>,
    pub enabled: bool,
}

/// Read seam for guild subscriptions plus the single write-back the
/// dispatcher performs.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// List guilds with at least one enabled setting for `kind`, in a
    /// deterministic order.
    async fn list_for_kind(&self, kind: EventKind) -> Result<Vec<GuildSubscriber>, StoreError>;

    /// Record the message id of a delivered notification so the next one can
    /// edit the same message.
    async fn save_message_id(
        &self,
        guild_id: i64,
        kind: EventKind,
        channel_id: i64,
        message_id: i64,
    ) -> Result<(), StoreError>;
}

/// Postgres-backed [`SubscriberStore`] over `guilds` + `guild_event_settings`.
#[derive(Clone)]
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriberRow {
    guild_id: i64,
    locale: CompactString,
    kind: EventKind,
    channel_id: Option<i64>,
    mention_role: Option<i64>,
    last_message_id: Option<i64>,
    enabled: bool,
}

/// Group rows (ordered by guild id) into one [`GuildSubscriber`] per guild.
fn group_rows(rows: Vec<SubscriberRow>) -> Vec<GuildSubscriber> {
    let mut guilds: Vec<GuildSubscriber> = Vec::new();
    for row in rows {
        let setting = DeliverySetting {
            kind: row.kind,
            channel_id: row.channel_id,
            mention_role: row.mention_role,
            last_message_id: row.last_message_id,
            enabled: row.enabled,
        };
        match guilds.last_mut() {
            Some(guild) if guild.guild_id == row.guild_id => guild.settings.push(setting),
            _ => guilds.push(GuildSubscriber {
                guild_id: row.guild_id,
                locale: row.locale,
                settings: vec![setting],
            }),
        }
    }
    guilds
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn list_for_kind(&self, kind: EventKind) -> Result<Vec<GuildSubscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT g.guild_id, g.locale, s.kind, s.channel_id,
                   s.mention_role, s.last_message_id, s.enabled
            FROM guild_event_settings s
            JOIN guilds g ON g.guild_id = s.guild_id
            WHERE s.kind = $1 AND s.enabled
            ORDER BY g.guild_id, s.id
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(group_rows(rows))
    }

    async fn save_message_id(
        &self,
        guild_id: i64,
        kind: EventKind,
        channel_id: i64,
        message_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE guild_event_settings
            SET last_message_id = $4
            WHERE guild_id = $1 AND kind = $2 AND channel_id = $3
            "#,
        )
        .bind(guild_id)
        .bind(kind)
        .bind(channel_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(guild_id: i64, channel_id: i64) -> SubscriberRow {
        SubscriberRow {
            guild_id,
            locale: CompactString::const_new("en"),
            kind: EventKind::Helltide,
            channel_id: Some(channel_id),
            mention_role: None,
            last_message_id: None,
            enabled: true,
        }
    }

    #[test]
    fn groups_consecutive_rows_by_guild() {
        let guilds = group_rows(vec![row(1, 10), row(1, 11), row(2, 20)]);
        assert_eq!(guilds.len(), 2);
        assert_eq!(guilds[0].guild_id, 1);
        assert_eq!(guilds[0].settings.len(), 2);
        assert_eq!(guilds[1].guild_id, 2);
        assert_eq!(guilds[1].settings.len(), 1);
    }

    #[test]
    fn empty_rows_yield_no_guilds() {
        assert!(group_rows(Vec::new()).is_empty());
    }
}
