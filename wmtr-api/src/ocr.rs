//! Recognition client
//!
//! One outbound multipart call to the remote meter-recognition endpoint,
//! bounded by a single hard timeout. No retries: a failed or timed-out
//! attempt is final for that ingestion, and the human-correction fallback
//! takes over from there.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use wmtr_common::{Error, Result};

/// Body fragments the remote platform emits when it killed the request
/// server-side before producing a result.
const TIMEOUT_MARKERS: [&str; 2] = ["FUNCTION_INVOCATION_TIMEOUT", "timeout"];

/// Result of one recognition attempt against the remote service
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    /// Well-formed success payload with a parseable numeric reading
    Recognized {
        value: f64,
        /// The reading exactly as the remote service printed it
        text: String,
    },
    /// HTTP success but no usable value (non-JSON, wrong shape, or a
    /// result that does not parse as a number)
    Unreadable(String),
    /// Non-2xx HTTP status, or a transport error (`status` 0)
    RemoteFailure { status: u16, body: String },
    /// Local deadline elapsed; the in-flight call was dropped
    TimedOut,
}

impl RecognitionOutcome {
    /// True for a `RemoteFailure` whose body carries a timeout signature,
    /// meaning the remote side gave up rather than genuinely erroring.
    pub fn is_server_timeout(&self) -> bool {
        match self {
            RecognitionOutcome::RemoteFailure { body, .. } => has_timeout_marker(body),
            _ => false,
        }
    }
}

/// Does a remote failure body carry a timeout signature?
pub fn has_timeout_marker(body: &str) -> bool {
    TIMEOUT_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Client for the remote meter-recognition endpoint
#[derive(Debug, Clone)]
pub struct OcrClient {
    http_client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl OcrClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Internal(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url,
            timeout,
        })
    }

    /// Submit an image for recognition.
    ///
    /// Every failure mode is encoded in the returned outcome; this call
    /// itself never errors. Cancelling at the deadline drops the in-flight
    /// request without affecting anything already persisted.
    pub async fn recognize(&self, image_bytes: Vec<u8>, file_name: String) -> RecognitionOutcome {
        let attempt = self.attempt(image_bytes, file_name);

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %self.url, timeout = ?self.timeout, "Recognition call timed out");
                RecognitionOutcome::TimedOut
            }
        }
    }

    async fn attempt(&self, image_bytes: Vec<u8>, file_name: String) -> RecognitionOutcome {
        let part = reqwest::multipart::Part::bytes(image_bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(url = %self.url, "Calling recognition endpoint");

        let response = match self
            .http_client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Recognition transport error");
                return RecognitionOutcome::RemoteFailure {
                    status: 0,
                    body: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(status = %status, "Recognition endpoint returned error status");
            return RecognitionOutcome::RemoteFailure {
                status: status.as_u16(),
                body,
            };
        }

        parse_success_body(&body)
    }
}

/// Interpret an HTTP-success body: `{success: true, result: "<number>"}`
/// yields `Recognized`; anything else is `Unreadable`, including a result
/// that fails to parse as a float.
fn parse_success_body(body: &str) -> RecognitionOutcome {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => {
            debug!("Recognition body is not JSON");
            return RecognitionOutcome::Unreadable(body.to_string());
        }
    };

    if json.get("success").and_then(Value::as_bool) != Some(true) {
        return RecognitionOutcome::Unreadable(body.to_string());
    }

    // The service prints the reading as a numeric string; tolerate a bare
    // JSON number as well.
    let text = match json.get("result") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return RecognitionOutcome::Unreadable(body.to_string()),
    };

    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => RecognitionOutcome::Recognized { value, text },
        _ => {
            debug!(result = %text, "Recognition result is not numeric");
            RecognitionOutcome::Unreadable(body.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_success() {
        let outcome = parse_success_body(r#"{"success": true, "result": "123.45"}"#);
        assert_eq!(
            outcome,
            RecognitionOutcome::Recognized {
                value: 123.45,
                text: "123.45".to_string()
            }
        );
    }

    #[test]
    fn test_parse_numeric_result_field() {
        let outcome = parse_success_body(r#"{"success": true, "result": 88}"#);
        assert!(matches!(
            outcome,
            RecognitionOutcome::Recognized { value, .. } if value == 88.0
        ));
    }

    #[test]
    fn test_html_body_is_unreadable() {
        let outcome = parse_success_body("<html><body>504 Gateway Timeout</body></html>");
        assert!(matches!(outcome, RecognitionOutcome::Unreadable(_)));
    }

    #[test]
    fn test_success_false_is_unreadable() {
        let outcome = parse_success_body(r#"{"success": false, "result": "n/a"}"#);
        assert!(matches!(outcome, RecognitionOutcome::Unreadable(_)));
    }

    #[test]
    fn test_non_numeric_result_is_unreadable_not_a_crash() {
        let outcome = parse_success_body(r#"{"success": true, "result": "blurry"}"#);
        assert!(matches!(outcome, RecognitionOutcome::Unreadable(_)));
    }

    #[test]
    fn test_missing_result_is_unreadable() {
        let outcome = parse_success_body(r#"{"success": true}"#);
        assert!(matches!(outcome, RecognitionOutcome::Unreadable(_)));
    }

    #[test]
    fn test_server_timeout_marker_detection() {
        let timeout = RecognitionOutcome::RemoteFailure {
            status: 504,
            body: "FUNCTION_INVOCATION_TIMEOUT".to_string(),
        };
        assert!(timeout.is_server_timeout());

        let lowercase = RecognitionOutcome::RemoteFailure {
            status: 502,
            body: "upstream timeout while connecting".to_string(),
        };
        assert!(lowercase.is_server_timeout());

        let plain = RecognitionOutcome::RemoteFailure {
            status: 500,
            body: "internal error".to_string(),
        };
        assert!(!plain.is_server_timeout());

        assert!(!RecognitionOutcome::TimedOut.is_server_timeout());
    }
}
