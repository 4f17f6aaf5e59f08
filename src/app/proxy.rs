//! Defines an abstraction over the event sending mechanism.

use super::events::UserEvent;
use tokio::sync::mpsc::UnboundedSender;

/// A trait that abstracts the sending of user events.
/// This is "fire-and-forget" and doesn't return a result.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: UserEvent);
}

/// The driver's output task listens on the other end of this channel.
impl EventProxy for UnboundedSender<UserEvent> {
    fn send_event(&self, event: UserEvent) {
        if let Err(e) = self.send(event) {
            tracing::warn!("Failed to send event to the output task: {}", e);
        }
    }
}
