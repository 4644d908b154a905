// # Webhook Notifier
//
// Posts a JSON summary of every reconciliation pass that rewrote proxy
// config files to a user-supplied URL.
//
// ## Behavior
//
// - One POST per notified pass, no retries (the next change notifies again)
// - HTTP timeout of 10 seconds
// - Non-2xx responses are errors; the reconciler logs them and moves on
// - The URL is never logged in full: webhook URLs usually embed a secret
//
// ## Payload
//
// ```json
// {
//   "source": "proxysync",
//   "timestamp": "2025-01-09T12:00:00Z",
//   "summary": "Updated 1 proxy config file(s): api.example.org 1.2.3.4 -> 5.6.7.8",
//   "result": { "pass": 3, "mutated_files": 1, ... }
// }
// ```

use async_trait::async_trait;
use proxysync_core::config::NotificationConfig;
use proxysync_core::traits::Notifier;
use proxysync_core::{Error, ReconciliationResult, Result};
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for webhook delivery
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook notifier
///
/// The Debug implementation does not expose the URL path or query.
pub struct WebhookNotifier {
    url: reqwest::Url,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("host", &self.url.host_str().unwrap_or("<none>"))
            .field("url", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    source: &'static str,
    timestamp: String,
    summary: String,
    result: &'a ReconciliationResult,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`
    ///
    /// # Errors
    ///
    /// `Error::Config` if the URL is empty, unparsable or not http(s).
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::notification(format!("failed to build HTTP client: {}", e)))?;

        Self::with_client(url, client)
    }

    /// Create a notifier with a preconfigured HTTP client
    pub fn with_client(url: &str, client: reqwest::Client) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::config("webhook_url cannot be empty"));
        }

        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::config(format!("invalid webhook_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "webhook_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(Self { url, client })
    }

    /// Build a notifier from the `settings.notification` block
    ///
    /// Returns `Ok(None)` when notifications are disabled or no webhook is set.
    /// An email address is accepted but not delivered.
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        if !config.email.is_empty() {
            tracing::warn!("Email notifications are not supported; only the webhook is used");
        }
        if config.webhook_url.trim().is_empty() {
            tracing::warn!("Notifications enabled but no webhook_url configured");
            return Ok(None);
        }
        Self::new(&config.webhook_url).map(Some)
    }
}

/// One-line human summary of a pass
pub fn summarize(result: &ReconciliationResult) -> String {
    let mut summary = format!("Updated {} proxy config file(s)", result.mutated_files);

    if !result.ip_changes.is_empty() {
        let changes: Vec<String> = result
            .ip_changes
            .iter()
            .map(|c| format!("{} {} -> {}", c.hostname, c.old_ip, c.new_ip))
            .collect();
        summary.push_str(": ");
        summary.push_str(&changes.join(", "));
    }
    if result.failed_mutations > 0 {
        summary.push_str(&format!("; {} rewrite(s) failed", result.failed_mutations));
    }
    if result.restart_needed && !result.restarted {
        summary.push_str("; proxy not restarted");
    }

    summary
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, result: &ReconciliationResult) -> Result<()> {
        let payload = Payload {
            source: "proxysync",
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: summarize(result),
            result,
        };

        tracing::debug!(
            host = self.url.host_str().unwrap_or("<none>"),
            pass = result.pass,
            "Sending webhook notification"
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            // reqwest errors carry the URL; strip it
            .map_err(|e| Error::notification(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::notification(match status.as_u16() {
                401 | 403 => format!("webhook rejected the request: {}", status),
                404 => format!("webhook endpoint not found: {}", status),
                429 => format!("webhook rate limit exceeded: {}", status),
                500..=599 => format!("webhook server error (transient): {}", status),
                _ => format!("webhook returned {}", status),
            }));
        }

        tracing::info!(pass = result.pass, "Webhook notification sent");
        Ok(())
    }
}
