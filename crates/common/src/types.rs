use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification delivery status.
///
/// The only legal transition is `Pending` → `Complete`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Complete,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is neither `pending` nor `complete`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for NotificationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "complete" => Ok(NotificationStatus::Complete),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A delayed notification, as persisted in the `notifications` table.
///
/// `id` is `0` until the durable store assigns one. `chat_id == 0` and an empty
/// `email` mean the respective channel is not used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub chat_id: i64,
    pub message: String,
    pub email: String,
    pub status: NotificationStatus,
    pub scheduled_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the record asks for delivery over the chat channel.
    pub fn wants_chat(&self) -> bool {
        self.chat_id != 0
    }

    /// Whether the record asks for delivery by email.
    pub fn wants_email(&self) -> bool {
        !self.email.is_empty()
    }

    /// Milliseconds from `now` until the scheduled time. Negative when overdue.
    pub fn delay_millis(&self, now: DateTime<Utc>) -> i64 {
        (self.scheduled_at - now).num_milliseconds()
    }
}
