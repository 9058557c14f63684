use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
///
/// Shared by the API and the notifier binaries; each reads the fields it needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string (required by the API only)
    pub database_url: Option<String>,

    /// Redis connection string (cache + delay queue)
    pub redis_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// HTTP port of the API server (default: 8080)
    pub api_port: u16,

    /// Minimum lead time between "now" and a notification's scheduled time (default: 20s)
    pub min_lead_time_secs: u64,

    /// Redis key of the delay queue sorted set
    pub delay_queue_key: String,

    /// How often the notifier polls the delay queue when idle (default: 500ms)
    pub queue_poll_interval_ms: u64,

    /// How long a claimed message may stay unacknowledged before redelivery (default: 60s)
    pub queue_visibility_timeout_secs: u64,

    /// Base URL of the API, used by the notifier to report completion
    pub notifier_api_url: String,

    /// Telegram bot token; chat delivery is disabled when unset
    pub telegram_bot_token: Option<String>,

    /// SMTP relay host
    pub smtp_host: String,

    /// SMTP relay port
    pub smtp_port: u16,

    /// SMTP username, also used as the sender address; email delivery is disabled when unset
    pub smtp_username: Option<String>,

    /// SMTP password
    pub smtp_password: Option<String>,

    /// Subject line of notification emails
    pub email_subject: String,

    /// How long in-flight deliveries may run after a shutdown signal (default: 10s)
    pub shutdown_grace_secs: u64,

    /// Request timeout of the notifier's HTTP client (default: 10s)
    pub http_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 20)?,
            api_port: parse_var("PORT", 8080)?,
            min_lead_time_secs: parse_var("MIN_LEAD_TIME_SECS", 20)?,
            delay_queue_key: std::env::var("DELAY_QUEUE_KEY")
                .unwrap_or_else(|_| "courier:delayed".to_string()),
            queue_poll_interval_ms: parse_var("QUEUE_POLL_INTERVAL_MS", 500)?,
            queue_visibility_timeout_secs: parse_var("QUEUE_VISIBILITY_TIMEOUT_SECS", 60)?,
            notifier_api_url: std::env::var("NOTIFIER_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            smtp_host: std::env::var("SMTP_HOST")
                .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: parse_var("SMTP_PORT", 587)?,
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            email_subject: std::env::var("EMAIL_SUBJECT")
                .unwrap_or_else(|_| "New notification".to_string()),
            shutdown_grace_secs: parse_var("SHUTDOWN_GRACE_SECS", 10)?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", 10)?,
        })
    }

    /// The database URL, or an error naming the missing variable.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))
    }

    pub fn min_lead_time(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_lead_time_secs as i64)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms)
    }

    pub fn queue_visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_visibility_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: "redis://localhost:6379".to_string(),
            db_max_connections: 20,
            api_port: 8080,
            min_lead_time_secs: 20,
            delay_queue_key: "courier:delayed".to_string(),
            queue_poll_interval_ms: 500,
            queue_visibility_timeout_secs: 60,
            notifier_api_url: "http://localhost:8080".to_string(),
            telegram_bot_token: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            email_subject: "New notification".to_string(),
            shutdown_grace_secs: 10,
            http_timeout_secs: 10,
        }
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
fn parse_var<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                key,
                std::any::type_name::<T>()
            )
        }),
        Err(_) => Ok(default),
    }
}
