use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use courier_common::config::AppConfig;
use courier_common::delay_queue::RedisDelayQueue;
use courier_common::redis_pool::create_redis_pool;
use courier_notifier::channels::{ChannelSender, EmailSender, TelegramSender};
use courier_notifier::dispatch::Dispatcher;
use courier_notifier::reporter::{HttpStatusReporter, build_http_client};
use courier_notifier::shutdown::cancel_on_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_notifier=info".into()),
        )
        .json()
        .init();

    tracing::info!("Courier notifier starting...");

    let config = AppConfig::from_env()?;

    let redis = create_redis_pool(&config.redis_url).await?;
    let queue = RedisDelayQueue::new(
        redis,
        &config.delay_queue_key,
        config.queue_visibility_timeout(),
    );
    tracing::info!(key = queue.key(), "Connected to delay queue");

    let client = build_http_client(config.http_timeout())?;
    let reporter = Arc::new(HttpStatusReporter::new(
        client.clone(),
        &config.notifier_api_url,
    ));

    let chat: Option<Arc<dyn ChannelSender>> = match &config.telegram_bot_token {
        Some(token) => Some(Arc::new(TelegramSender::new(client, token))),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, chat delivery disabled");
            None
        }
    };

    let email: Option<Arc<dyn ChannelSender>> = match &config.smtp_username {
        Some(username) => Some(Arc::new(EmailSender::new(
            &config.smtp_host,
            config.smtp_port,
            username,
            config.smtp_password.as_deref().unwrap_or_default(),
            &config.email_subject,
        )?)),
        None => {
            tracing::warn!("SMTP_USERNAME not set, email delivery disabled");
            None
        }
    };

    let dispatcher = Dispatcher::new(reporter, chat, email);
    let shutdown = CancellationToken::new();

    // Stop claiming on Ctrl+C or SIGTERM; the current message is finished first
    cancel_on_signal(shutdown.clone())?;

    dispatcher
        .run(&queue, config.queue_poll_interval(), shutdown)
        .await;

    dispatcher.drain(config.shutdown_grace()).await;

    tracing::info!("Courier notifier stopped.");
    Ok(())
}
