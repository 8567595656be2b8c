//! Event channel factories and handles.

use super::types::NotifyRequest;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// Enough to absorb a full fan-out burst while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for NotifyRequest events.
pub type NotifyRequestSender = mpsc::Sender<NotifyRequest>;
/// Receiver handle for NotifyRequest events.
pub type NotifyRequestReceiver = mpsc::Receiver<NotifyRequest>;

/// Create a new NotifyRequest channel.
///
/// Returns a (sender, receiver) pair connecting the watcher to the
/// dispatcher.
pub fn notify_request_channel() -> (NotifyRequestSender, NotifyRequestReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
