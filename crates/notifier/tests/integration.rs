//! End-to-end lifecycle: create through the service, deliver through the
//! dispatcher, observe the status change, delete.
//!
//! Runs entirely on the in-memory backends from `courier-engine`; the status
//! reporter calls the service in-process instead of going over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use courier_common::error::AppError;
use courier_common::types::{Notification, NotificationStatus};
use courier_engine::memory::{InMemoryCache, InMemoryQueue, InMemoryStore};
use courier_engine::service::NotificationService;
use courier_engine::storage::NotificationStorage;
use courier_notifier::channels::ChannelSender;
use courier_notifier::dispatch::{DispatchOutcome, Dispatcher};
use courier_notifier::reporter::StatusReporter;
use courier_notifier::source::DeliverySource;

// ============================================================
// Helpers
// ============================================================

struct QueueSource(Arc<InMemoryQueue>);

#[async_trait]
impl DeliverySource for QueueSource {
    async fn claim_due(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.0.pop())
    }

    async fn ack(&self, _payload: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn requeue_expired(&self) -> anyhow::Result<u64> {
        Ok(0)
    }
}

struct ServiceReporter(Arc<NotificationService>);

#[async_trait]
impl StatusReporter for ServiceReporter {
    async fn report_complete(&self, id: i64) -> anyhow::Result<()> {
        self.0.update_status("complete", id).await?;
        Ok(())
    }
}

struct RecordingSender {
    name: &'static str,
    fail: bool,
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingSender {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel(&self) -> &'static str {
        self.name
    }

    async fn send(&self, n: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((n.id, n.message.clone()));
        if self.fail {
            anyhow::bail!("simulated network error");
        }
        Ok(())
    }
}

struct System {
    service: Arc<NotificationService>,
    queue: Arc<InMemoryQueue>,
}

fn system() -> System {
    let queue = Arc::new(InMemoryQueue::new());
    let storage = NotificationStorage::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryCache::new()),
        queue.clone(),
    );
    System {
        service: Arc::new(NotificationService::new(
            storage,
            chrono::Duration::seconds(20),
        )),
        queue,
    }
}

fn in_30s(chat_id: i64, email: &str) -> Notification {
    Notification {
        chat_id,
        message: "hi".to_string(),
        email: email.to_string(),
        scheduled_at: Utc::now() + chrono::Duration::seconds(30),
        ..Default::default()
    }
}

// ============================================================
// Lifecycle
// ============================================================

#[tokio::test]
async fn test_create_dispatch_get_delete() {
    let sys = system();
    let chat = RecordingSender::new("telegram", false);
    let dispatcher = Dispatcher::new(
        Arc::new(ServiceReporter(sys.service.clone())),
        Some(chat.clone()),
        None,
    );

    let id = sys.service.create(in_30s(123, "")).await.unwrap();
    assert_eq!(id, 1);

    let published = sys.queue.published();
    assert_eq!(published.len(), 1);
    let delay_ms = published[0].1;
    assert!(delay_ms > 29_000 && delay_ms <= 30_000, "delay was {delay_ms}");

    // The transport would hold the payload for `delay_ms`; deliver it now.
    let payload = sys.queue.pop().unwrap();
    let outcome = dispatcher.handle_delivery(&payload).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Dispatched {
            chat: true,
            email: false
        }
    );
    assert!(dispatcher.drain(Duration::from_secs(1)).await);

    assert_eq!(chat.sent(), vec![(1, "hi".to_string())]);
    assert_eq!(
        sys.service.get(1).await.unwrap().status,
        NotificationStatus::Complete
    );

    sys.service.delete(1).await.unwrap();
    assert!(matches!(sys.service.get(1).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_redelivery_reports_idempotently() {
    let sys = system();
    let dispatcher = Dispatcher::new(
        Arc::new(ServiceReporter(sys.service.clone())),
        None,
        None,
    );

    sys.service.create(in_30s(123, "")).await.unwrap();
    let payload = sys.queue.pop().unwrap();

    for _ in 0..2 {
        assert!(matches!(
            dispatcher.handle_delivery(&payload).await,
            DispatchOutcome::Dispatched { .. }
        ));
    }
    assert_eq!(
        sys.service.get(1).await.unwrap().status,
        NotificationStatus::Complete
    );
}

#[tokio::test]
async fn test_deleted_before_delivery_sends_nothing() {
    let sys = system();
    let chat = RecordingSender::new("telegram", false);
    let dispatcher = Dispatcher::new(
        Arc::new(ServiceReporter(sys.service.clone())),
        Some(chat.clone()),
        None,
    );

    let id = sys.service.create(in_30s(123, "")).await.unwrap();
    sys.service.delete(id).await.unwrap();

    let payload = sys.queue.pop().unwrap();
    assert_eq!(
        dispatcher.handle_delivery(&payload).await,
        DispatchOutcome::ReportFailed
    );
    dispatcher.drain(Duration::from_secs(1)).await;
    assert!(chat.sent().is_empty());
}

// ============================================================
// Fan-out isolation through the running loop
// ============================================================

#[tokio::test]
async fn test_failing_channel_does_not_stop_the_other_or_the_loop() {
    let sys = system();
    let chat = RecordingSender::new("telegram", true);
    let email = RecordingSender::new("email", false);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(ServiceReporter(sys.service.clone())),
        Some(chat.clone()),
        Some(email.clone()),
    ));

    sys.service
        .create(in_30s(123, "user@example.com"))
        .await
        .unwrap();
    sys.service
        .create(in_30s(456, "other@example.com"))
        .await
        .unwrap();

    let source = Arc::new(QueueSource(sys.queue.clone()));
    let shutdown = CancellationToken::new();
    let handle = {
        let dispatcher = dispatcher.clone();
        let source = source.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            dispatcher
                .run(source.as_ref(), Duration::from_millis(10), shutdown)
                .await
        })
    };

    tokio::time::timeout(Duration::from_secs(2), async {
        while email.sent().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    shutdown.cancel();
    handle.await.unwrap();
    assert!(dispatcher.drain(Duration::from_secs(1)).await);

    assert_eq!(chat.sent().len(), 2);
    assert_eq!(email.sent().len(), 2);
    for id in [1, 2] {
        assert_eq!(
            sys.service.get(id).await.unwrap().status,
            NotificationStatus::Complete
        );
    }
}
