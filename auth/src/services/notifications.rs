use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewRequest,
    RequestRejected,
    RequestAccepted,
}

/// Payload pushed to every socket in a user's room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new_request(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::NewRequest,
            message: message.into(),
            skill_name: None,
            rejected_by: None,
            accepted_by: None,
            timestamp: Utc::now(),
        }
    }

    pub fn request_rejected(skill_name: impl Into<String>, rejected_by: impl Into<String>) -> Self {
        let skill_name = skill_name.into();
        let rejected_by = rejected_by.into();
        Self {
            kind: NotificationKind::RequestRejected,
            message: format!("Your request for \"{}\" was rejected by {}", skill_name, rejected_by),
            skill_name: Some(skill_name),
            rejected_by: Some(rejected_by),
            accepted_by: None,
            timestamp: Utc::now(),
        }
    }

    pub fn request_accepted(skill_name: impl Into<String>, accepted_by: impl Into<String>) -> Self {
        let skill_name = skill_name.into();
        let accepted_by = accepted_by.into();
        Self {
            kind: NotificationKind::RequestAccepted,
            message: format!("Your request for \"{}\" was accepted by {}", skill_name, accepted_by),
            skill_name: Some(skill_name),
            rejected_by: None,
            accepted_by: Some(accepted_by),
            timestamp: Utc::now(),
        }
    }
}

type Outbox = mpsc::UnboundedSender<String>;

/// Per-user rooms of authenticated sockets.
#[derive(Default)]
pub struct NotificationHub {
    rooms: DashMap<Uuid, Vec<(u64, Outbox)>>,
    next_connection: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `user_id`'s room. Messages arrive on the receiver until the
    /// returned membership is dropped.
    pub fn join(self: &Arc<Self>, user_id: Uuid) -> (RoomMembership, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.rooms.entry(user_id).or_default().push((connection_id, tx));

        tracing::debug!(user_id = %user_id, connection_id, "socket joined notification room");
        let membership = RoomMembership { hub: Arc::clone(self), user_id, connection_id };
        (membership, rx)
    }

    fn leave(&self, user_id: Uuid, connection_id: u64) {
        if let Some(mut room) = self.rooms.get_mut(&user_id) {
            room.retain(|(id, _)| *id != connection_id);
        }
        self.rooms.remove_if(&user_id, |_, room| room.is_empty());
        tracing::debug!(user_id = %user_id, connection_id, "socket left notification room");
    }

    /// Send to every open socket of `user_id`; returns how many received it.
    pub fn notify(&self, user_id: Uuid, notification: &Notification) -> usize {
        let payload = match serde_json::to_string(notification) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode notification");
                return 0;
            }
        };

        let Some(mut room) = self.rooms.get_mut(&user_id) else {
            return 0;
        };
        room.retain(|(_, outbox)| !outbox.is_closed());
        let delivered = room
            .iter()
            .filter(|(_, outbox)| outbox.send(payload.clone()).is_ok())
            .count();

        tracing::info!(user_id = %user_id, kind = ?notification.kind, delivered, "notification sent");
        delivered
    }

    pub fn connections(&self, user_id: Uuid) -> usize {
        self.rooms.get(&user_id).map(|room| room.len()).unwrap_or(0)
    }
}

/// Leaves the room on drop.
pub struct RoomMembership {
    hub: Arc<NotificationHub>,
    user_id: Uuid,
    connection_id: u64,
}

impl RoomMembership {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl Drop for RoomMembership {
    fn drop(&mut self) {
        self.hub.leave(self.user_id, self.connection_id);
    }
}
