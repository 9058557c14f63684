//! Outbound delivery channels.
//!
//! A sender makes exactly one attempt per call and reports the outcome; it
//! never retries. The dispatcher logs failures and moves on.

pub mod email;
pub mod telegram;

use async_trait::async_trait;

use courier_common::types::Notification;

pub use email::EmailSender;
pub use telegram::TelegramSender;

#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Short name used in logs, e.g. `"telegram"`.
    fn channel(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}
