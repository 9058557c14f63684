//! Reports delivered notifications back to the API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// HTTP client shared by the reporter and the Telegram channel. Every request
/// is bounded by `timeout`, so a hung peer cannot stall the dispatch loop.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Marks a notification as `complete` in the owning service.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report_complete(&self, id: i64) -> anyhow::Result<()>;
}

/// Calls `PATCH {base_url}/notify/{id}` with `{"status":"complete"}`.
pub struct HttpStatusReporter {
    client: Client,
    base_url: String,
}

impl HttpStatusReporter {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, id: i64) -> String {
        format!("{}/notify/{}", self.base_url, id)
    }
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
    async fn report_complete(&self, id: i64) -> anyhow::Result<()> {
        let response = self
            .client
            .patch(self.url(id))
            .json(&json!({ "status": "complete" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("status report returned {status}: {body}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_to_unresponsive_api_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = build_http_client(Duration::from_millis(200)).unwrap();
        let reporter = HttpStatusReporter::new(client, format!("http://{addr}"));

        let result = tokio::time::timeout(Duration::from_secs(5), reporter.report_complete(1))
            .await
            .expect("client timeout should fire first");
        assert!(result.is_err());
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let reporter = HttpStatusReporter::new(Client::new(), "http://api:8080/");
        assert_eq!(reporter.url(7), "http://api:8080/notify/7");
    }
}
