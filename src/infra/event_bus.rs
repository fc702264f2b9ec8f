use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::ports::notifier::{Notification, Notifier};

/// Slow subscribers that fall further behind than this skip ahead and lose
/// the missed events; there is deliberately no replay.
const CHANNEL_CAPACITY: usize = 64;

/// Broadcast fan-out to connected admin clients.
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for EventBus {
    async fn publish(&self, notification: Notification) {
        // Err here just means nobody is connected right now.
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification dropped: no connected subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mail_server::RemoteMailbox;

    fn mailbox(username: &str) -> RemoteMailbox {
        RemoteMailbox {
            username: username.into(),
            name: None,
            active: None,
            messages: None,
            created: None,
        }
    }

    #[tokio::test]
    async fn delivers_to_every_connected_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Notification::NewMailboxes {
            new_mailboxes: vec![mailbox("carol")],
        })
        .await;

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                Notification::NewMailboxes { new_mailboxes } => {
                    assert_eq!(new_mailboxes[0].username, "carol");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn late_subscribers_get_no_replay() {
        let bus = EventBus::new();

        bus.publish(Notification::NewMailboxes {
            new_mailboxes: vec![mailbox("carol")],
        })
        .await;

        let mut late = bus.subscribe();
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let bus = EventBus::new();
        bus.publish(Notification::NewMailboxes {
            new_mailboxes: vec![],
        })
        .await;
    }

    #[test]
    fn events_serialize_with_original_event_names() {
        let event = Notification::NewMailboxes {
            new_mailboxes: vec![mailbox("carol")],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "newMailboxes");
        assert_eq!(json["data"]["newMailboxes"][0]["username"], "carol");
    }
}
