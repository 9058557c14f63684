//! SMTP email channel (STARTTLS relay).

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use courier_common::types::Notification;

use super::ChannelSender;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl EmailSender {
    /// Build a sender that authenticates as `username` and also uses it as
    /// the From address.
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        subject: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let from: Mailbox = username
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid sender address {username:?}: {e}"))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            mailer,
            from,
            subject: subject.into(),
        })
    }

    fn build_message(&self, notification: &Notification) -> anyhow::Result<Message> {
        let to: Mailbox = notification
            .email
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid recipient {:?}: {e}", notification.email))?;

        Ok(Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.message.clone())?)
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let message = self.build_message(notification)?;
        self.mailer.send(message).await?;

        tracing::debug!(notification_id = notification.id, "Email sent");
        Ok(())
    }
}
