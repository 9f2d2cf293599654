//! Best-effort callback to the grader's evaluation endpoint.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

/// POSTs deployment results. Never returns an error: failures come back as
/// an `{"error": ...}` record.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl Notifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Send `body` to `url`.
    ///
    /// - 2xx with a JSON body: that body
    /// - 2xx with anything else: `{"status_code", "text"}`
    /// - transport error, timeout or non-2xx: `{"error"}`
    pub async fn notify<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Value {
        let resp = match self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(url, error = %e, "evaluation callback failed");
                return json!({ "error": e.to_string() });
            }
        };

        let status = resp.status().as_u16();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to read evaluation callback response");
                return json!({ "error": e.to_string() });
            }
        };
        tracing::info!(url, status, "evaluation callback delivered");
        serde_json::from_str(&text).unwrap_or_else(|_| json!({ "status_code": status, "text": text }))
    }
}
