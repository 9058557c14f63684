//! Dispatch loop: claim, decode, report, fan out.
//!
//! Each delivered payload goes through `decode → report complete → fan out`.
//! Decode and report failures abandon the message. The chat and email sends
//! are spawned as separate tracked tasks so a slow or failing channel never
//! holds up the other one, nor the next claim.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use courier_common::codec;
use courier_common::types::Notification;

use crate::channels::ChannelSender;
use crate::reporter::StatusReporter;
use crate::source::DeliverySource;

/// What happened to one delivered payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The payload did not decode; dropped.
    Malformed,
    /// Completion could not be reported; nothing was sent.
    ReportFailed,
    /// Sends were started for the flagged channels.
    Dispatched { chat: bool, email: bool },
}

pub struct Dispatcher {
    reporter: Arc<dyn StatusReporter>,
    chat: Option<Arc<dyn ChannelSender>>,
    email: Option<Arc<dyn ChannelSender>>,
    tracker: TaskTracker,
}

impl Dispatcher {
    /// A `None` channel is treated as unconfigured: notifications asking for
    /// it are logged and skipped.
    pub fn new(
        reporter: Arc<dyn StatusReporter>,
        chat: Option<Arc<dyn ChannelSender>>,
        email: Option<Arc<dyn ChannelSender>>,
    ) -> Self {
        Self {
            reporter,
            chat,
            email,
            tracker: TaskTracker::new(),
        }
    }

    /// Handle one delivered payload. Returns once the sends are spawned, not
    /// once they finish.
    pub async fn handle_delivery(&self, payload: &[u8]) -> DispatchOutcome {
        let notification = match codec::decode(payload) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, len = payload.len(), "Dropping malformed payload");
                return DispatchOutcome::Malformed;
            }
        };
        let id = notification.id;

        // Report before sending: a failed report must not leave a sent but
        // still-pending notification behind.
        if let Err(e) = self.reporter.report_complete(id).await {
            tracing::error!(
                notification_id = id,
                error = %e,
                "Failed to report completion, dropping message"
            );
            return DispatchOutcome::ReportFailed;
        }

        let notification = Arc::new(notification);
        let chat = notification.wants_chat() && self.spawn_send(&self.chat, "chat", &notification);
        let email =
            notification.wants_email() && self.spawn_send(&self.email, "email", &notification);

        tracing::info!(notification_id = id, chat, email, "Notification dispatched");
        DispatchOutcome::Dispatched { chat, email }
    }

    fn spawn_send(
        &self,
        sender: &Option<Arc<dyn ChannelSender>>,
        wanted: &'static str,
        notification: &Arc<Notification>,
    ) -> bool {
        let Some(sender) = sender.clone() else {
            tracing::warn!(
                notification_id = notification.id,
                channel = wanted,
                "Channel not configured, skipping"
            );
            return false;
        };

        let notification = notification.clone();
        self.tracker.spawn(async move {
            if let Err(e) = sender.send(&notification).await {
                tracing::error!(
                    notification_id = notification.id,
                    channel = sender.channel(),
                    error = %e,
                    "Delivery failed"
                );
            }
        });
        true
    }

    /// Claim and handle payloads until `shutdown` is cancelled.
    ///
    /// Every claimed payload is acknowledged after handling, whatever the
    /// outcome. A claim is never abandoned halfway by a shutdown: the token is
    /// only checked between messages.
    pub async fn run(
        &self,
        source: &dyn DeliverySource,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Dispatch loop started");

        while !shutdown.is_cancelled() {
            match source.claim_due().await {
                Ok(Some(payload)) => {
                    self.handle_delivery(&payload).await;
                    if let Err(e) = source.ack(&payload).await {
                        tracing::error!(error = %e, "Failed to acknowledge payload");
                    }
                    continue;
                }
                Ok(None) => match source.requeue_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::warn!(count = n, "Requeued expired claims"),
                    Err(e) => tracing::error!(error = %e, "Failed to requeue expired claims"),
                },
                Err(e) => tracing::error!(error = %e, "Failed to claim from delay queue"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }

        tracing::info!("Dispatch loop stopped");
    }

    /// Stop accepting sends and wait up to `grace` for in-flight ones.
    /// Returns `false` if some were still running when the grace ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight deliveries");
        }

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.tracker.len(),
                    "Grace period elapsed with deliveries still running"
                );
                false
            }
        }
    }
}
