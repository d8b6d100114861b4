//! Notification types and event bus for list-change messaging.
//!
//! Operations that change a user's lists publish [`Notification`]s on a
//! broadcast [`EventBus`]. Delivery to the chat platform (websocket refresh,
//! bot direct messages, thread replies) is done by subscribers and is
//! fire-and-forget: with no subscriber the event is dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::ListKind;

/// Item summary attached to a direct message so clients can render
/// accept/decline actions for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemCard {
    pub title: String,
    pub item_id: String,
}

/// A user-visible side effect of a list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The user's clients should reload the given lists.
    Refresh { user_id: String, lists: Vec<ListKind> },

    /// Bot direct message to a user.
    DirectMessage {
        user_id: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        item: Option<ItemCard>,
    },

    /// Bot reply in the thread of the message an item was created from.
    ThreadReply {
        post_id: String,
        message: String,
        title: String,
    },
}

impl Notification {
    pub fn refresh(user_id: impl Into<String>, lists: &[ListKind]) -> Self {
        Self::Refresh {
            user_id: user_id.into(),
            lists: lists.to_vec(),
        }
    }

    pub fn direct(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DirectMessage {
            user_id: user_id.into(),
            message: message.into(),
            item: None,
        }
    }

    /// Direct message carrying an item card.
    pub fn direct_with_item(
        user_id: impl Into<String>,
        message: impl Into<String>,
        title: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self::DirectMessage {
            user_id: user_id.into(),
            message: message.into(),
            item: Some(ItemCard {
                title: title.into(),
                item_id: item_id.into(),
            }),
        }
    }

    /// Event type name for logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Refresh { .. } => "refresh",
            Self::DirectMessage { .. } => "direct_message",
            Self::ThreadReply { .. } => "thread_reply",
        }
    }
}

/// Envelope wrapping every emitted notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEnvelope {
    /// UUIDv7 event ID, time-ordered.
    pub event_id: Uuid,
    pub emitted_at: DateTime<Utc>,
    /// Bot identity the platform should post as.
    pub bot: String,
    pub payload: Notification,
}

/// Broadcast bus for notifications.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NotificationEnvelope>,
    bot: String,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity, posting as
    /// `bot`.
    pub fn new(capacity: usize, bot: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            bot: bot.into(),
        }
    }

    /// Emit a notification to all subscribers. Dropped silently if there
    /// are none.
    pub fn emit(&self, payload: Notification) {
        let envelope = NotificationEnvelope {
            event_id: Uuid::now_v7(),
            emitted_at: Utc::now(),
            bot: self.bot.clone(),
            payload,
        };
        tracing::debug!(
            event_type = envelope.payload.event_type(),
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive notifications. Each subscriber gets its own
    /// independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn bot(&self) -> &str {
        &self.bot
    }
}
