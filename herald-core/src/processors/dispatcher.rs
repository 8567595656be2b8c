//! Dispatcher processor.
//!
//! The Dispatcher is responsible for:
//! - Receiving `NotifyRequest` events from the watcher
//! - Listing the guilds subscribed to the event kind
//! - Building one fresh message per delivery setting
//! - Creating a new message, or editing the previously sent one when the
//!   setting already carries a message id
//! - Writing the resulting message id back for the next edit
//!
//! Failures are isolated per setting: one guild's broken channel never stops
//! delivery to the rest.

use crate::discord::{Messenger, OutboundMessage};
use crate::entities::{DeliverySetting, EventKind, GuildSubscriber, SubscriberStore};
use crate::events::{NotifyRequest, NotifyRequestReceiver};
use crate::source::GameEvent;
use kanau::processor::Processor;
use std::convert::Infallible;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Turns an event into display text for one locale.
///
/// Implementations are pure; the dispatcher calls this once per delivery
/// setting.
pub trait NoticeRenderer: Send + Sync {
    fn render(&self, kind: EventKind, event: &GameEvent, locale: &str) -> String;
}

/// Build the outbound message for one delivery setting.
///
/// Always starts from the rendered text, so a mention suffix never leaks from
/// one setting into another.
pub fn build_notice(rendered: &str, mention_role: Option<i64>) -> OutboundMessage {
    match mention_role {
        Some(role) => OutboundMessage {
            content: format!("{rendered}\n<@&{role}>"),
            mention_role: Some(role),
        },
        None => OutboundMessage {
            content: rendered.to_string(),
            mention_role: None,
        },
    }
}

/// Dispatcher fans notifications out to every subscribed guild.
pub struct Dispatcher<G, R, M> {
    subscribers: G,
    renderer: R,
    messenger: M,
    notify_rx: NotifyRequestReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl<G, R, M> Dispatcher<G, R, M>
where
    G: SubscriberStore,
    R: NoticeRenderer,
    M: Messenger,
{
    /// Create a new Dispatcher.
    ///
    /// # Arguments
    ///
    /// * `subscribers` - Guild subscription store
    /// * `renderer` - Notice text renderer
    /// * `messenger` - Message transport
    /// * `notify_rx` - Receiver for NotifyRequest events
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        subscribers: G,
        renderer: R,
        messenger: M,
        notify_rx: NotifyRequestReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscribers,
            renderer,
            messenger,
            notify_rx,
            shutdown_rx,
        }
    }

    /// Run the Dispatcher until shutdown is signaled.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }

                // Receive NotifyRequest events
                Some(request) = self.notify_rx.recv() => {
                    debug!(kind = %request.kind, stage = ?request.stage, "Received NotifyRequest");
                    let _ = self.process(request).await;
                }

                else => {
                    info!("NotifyRequest channel closed");
                    break;
                }
            }
        }

        info!("Dispatcher shutdown complete");
    }

    /// Deliver to one setting of one guild. Errors are logged, never
    /// propagated.
    async fn deliver(
        &self,
        guild: &GuildSubscriber,
        setting: &DeliverySetting,
        request: &NotifyRequest,
    ) {
        let Some(channel_id) = setting.channel_id else {
            debug!(
                guild_id = guild.guild_id,
                kind = %request.kind,
                "no channel configured, skipping"
            );
            return;
        };

        let rendered = self
            .renderer
            .render(request.kind, &request.event, &guild.locale);
        let message = build_notice(&rendered, setting.mention_role);

        let result = match setting.last_message_id {
            Some(message_id) => self.messenger.edit(channel_id, message_id, &message).await,
            None => self.messenger.send(channel_id, &message).await,
        };

        match result {
            Ok(message_id) => {
                // Best-effort write-back; a miss here means the next
                // notification creates a fresh message instead of editing.
                if let Err(e) = self
                    .subscribers
                    .save_message_id(guild.guild_id, request.kind, channel_id, message_id)
                    .await
                {
                    warn!(
                        guild_id = guild.guild_id,
                        kind = %request.kind,
                        error = %e,
                        "failed to store message id"
                    );
                }
            }
            Err(e) => {
                warn!(
                    guild_id = guild.guild_id,
                    kind = %request.kind,
                    channel_id,
                    error = %e,
                    "delivery failed"
                );
            }
        }
    }
}

impl<G, R, M> Processor<NotifyRequest> for Dispatcher<G, R, M>
where
    G: SubscriberStore,
    R: NoticeRenderer,
    M: Messenger,
{
    type Output = ();
    type Error = Infallible;

    async fn process(&self, request: NotifyRequest) -> Result<(), Infallible> {
        let guilds = match self.subscribers.list_for_kind(request.kind).await {
            Ok(guilds) => guilds,
            Err(e) => {
                error!(kind = %request.kind, error = %e, "failed to list subscribers");
                return Ok(());
            }
        };

        if guilds.is_empty() {
            debug!(kind = %request.kind, "no subscribers for event kind");
            return Ok(());
        }

        for guild in &guilds {
            for setting in &guild.settings {
                if setting.kind != request.kind || !setting.enabled {
                    continue;
                }
                self.deliver(guild, setting, &request).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_with_role_gets_suffix_and_scoped_mention() {
        let message = build_notice("Ashava has spawned!", Some(42));
        assert_eq!(message.content, "Ashava has spawned!\n<@&42>");
        assert_eq!(message.mention_role, Some(42));
    }

    #[test]
    fn notice_without_role_is_text_only() {
        let message = build_notice("Ashava has spawned!", None);
        assert_eq!(message.content, "Ashava has spawned!");
        assert_eq!(message.mention_role, None);
    }

    #[test]
    fn repeated_builds_never_accumulate_suffixes() {
        let first = build_notice("notice", Some(1));
        let second = build_notice("notice", Some(2));
        assert_eq!(first.content, "notice\n<@&1>");
        assert_eq!(second.content, "notice\n<@&2>");
    }
}
