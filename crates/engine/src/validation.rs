//! Business-rule checks applied before a notification is created or its status
//! changes.
//!
//! Everything here is pure: callers pass in "now" and the minimum lead time.
//! The request validators run at the HTTP boundary; [`check_notification`] and
//! [`check_id`] run again inside [`crate::service::NotificationService`], which
//! is the authoritative gate.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use courier_common::types::{Notification, NotificationStatus};

/// Default minimum distance between "now" and a notification's scheduled time.
pub const DEFAULT_MIN_LEAD_TIME_SECS: u64 = 20;

/// Body of a creation request. Every field arrives as a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateNotificationRequest {
    pub message: String,
    #[serde(alias = "telegram_id")]
    pub chat_id: String,
    pub email: String,
    /// RFC 3339 timestamp, e.g. `2030-01-02T15:04:05Z`.
    pub date: String,
}

/// Body of a status update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

impl CreateNotificationRequest {
    /// Turn the request into a pending [`Notification`] or a rejection reason.
    pub fn validate(
        &self,
        now: DateTime<Utc>,
        min_lead: Duration,
    ) -> Result<Notification, String> {
        if self.message.is_empty() {
            return Err("message is empty".to_string());
        }
        if self.chat_id.is_empty() && self.email.is_empty() {
            return Err("no recipient: chat_id and email are both empty".to_string());
        }

        let mut chat_id = 0;
        if !self.chat_id.is_empty() {
            chat_id = self
                .chat_id
                .parse::<i64>()
                .map_err(|_| "chat_id should be numeric".to_string())?;
            if chat_id <= 0 {
                return Err("chat_id should be > 0".to_string());
            }
        }

        if !self.email.is_empty() && !is_email_shaped(&self.email) {
            return Err("wrong email format".to_string());
        }

        let scheduled_at = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|_| {
                "wrong date value (format: RFC 3339, e.g. 2030-01-02T15:04:05Z)".to_string()
            })?
            .with_timezone(&Utc);
        check_lead_time(scheduled_at, now, min_lead)?;

        Ok(Notification {
            id: 0,
            chat_id,
            message: self.message.clone(),
            email: self.email.clone(),
            status: NotificationStatus::Pending,
            scheduled_at,
        })
    }
}

impl UpdateStatusRequest {
    pub fn validate(&self) -> Result<NotificationStatus, String> {
        parse_status(&self.status)
    }
}

/// Accept exactly `pending` or `complete`.
pub fn parse_status(raw: &str) -> Result<NotificationStatus, String> {
    raw.parse::<NotificationStatus>()
        .map_err(|_| "wrong status value (\"pending\" or \"complete\" only)".to_string())
}

/// Service-level checks on an already-typed notification.
pub fn check_notification(
    n: &Notification,
    now: DateTime<Utc>,
    min_lead: Duration,
) -> Result<(), String> {
    if n.message.is_empty() {
        return Err("message is empty".to_string());
    }
    if !n.wants_chat() && !n.wants_email() {
        return Err("no recipient: chat_id and email are both empty".to_string());
    }
    if n.chat_id < 0 {
        return Err("chat_id can't be <= 0".to_string());
    }
    if n.wants_email() && !is_email_shaped(&n.email) {
        return Err("not valid email format".to_string());
    }
    check_lead_time(n.scheduled_at, now, min_lead)
}

/// Identifiers are assigned by the store and always positive.
pub fn check_id(id: i64) -> Result<(), String> {
    if id <= 0 {
        return Err("notification id is negative or == 0".to_string());
    }
    Ok(())
}

fn check_lead_time(
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
    min_lead: Duration,
) -> Result<(), String> {
    if scheduled_at <= now + min_lead {
        return Err(format!(
            "date in past: must be more than {} seconds from now",
            min_lead.num_seconds()
        ));
    }
    Ok(())
}

/// An `@` followed somewhere later by a `.`.
fn is_email_shaped(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'))
}
