//! Outcome classifier
//!
//! Pure decision table mapping a recognition attempt to what gets
//! persisted and what the caller is told. Every outcome that plausibly
//! means "the image was fine but the reading could not be machine-read"
//! still commits a placeholder row, so the photo is never lost and a human
//! can complete the record later. Only a remote failure with no timeout
//! signature aborts with nothing recorded.

use serde::Serialize;
use wmtr_common::{Error, Result};

use crate::ocr::RecognitionOutcome;

/// Sentinel written when no machine-read value is available, signaling
/// "pending human correction"
pub const PLACEHOLDER_VALUE: f64 = 0.0;

/// Caller-facing status of a committed ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingStatus {
    /// Machine-read value persisted
    Success,
    /// Placeholder persisted; client should prompt for a manual value
    NeedsManualInput,
    /// Placeholder persisted after a local or server-side timeout
    Timeout,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Success => "success",
            ReadingStatus::NeedsManualInput => "needsManualInput",
            ReadingStatus::Timeout => "timeout",
        }
    }
}

/// The classifier's decision: what to persist and what to report
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub value: f64,
    pub status: ReadingStatus,
    /// The remote service's printed reading, present only on success
    pub text: Option<String>,
}

/// Map a recognition outcome to a persistence decision.
///
/// A `RemoteFailure` without a timeout marker is the one terminal case:
/// it propagates as an error and no row is written.
pub fn classify(outcome: RecognitionOutcome) -> Result<Decision> {
    match outcome {
        RecognitionOutcome::Recognized { value, text } => Ok(Decision {
            value,
            status: ReadingStatus::Success,
            text: Some(text),
        }),

        RecognitionOutcome::Unreadable(_) => Ok(Decision {
            value: PLACEHOLDER_VALUE,
            status: ReadingStatus::NeedsManualInput,
            text: None,
        }),

        RecognitionOutcome::TimedOut => Ok(Decision {
            value: PLACEHOLDER_VALUE,
            status: ReadingStatus::Timeout,
            text: None,
        }),

        RecognitionOutcome::RemoteFailure { status, body } => {
            if crate::ocr::has_timeout_marker(&body) {
                // The remote side gave up; same fallback as a local timeout
                Ok(Decision {
                    value: PLACEHOLDER_VALUE,
                    status: ReadingStatus::Timeout,
                    text: None,
                })
            } else {
                Err(Error::Recognition { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_keeps_exact_value() {
        let decision = classify(RecognitionOutcome::Recognized {
            value: 123.45,
            text: "123.45".to_string(),
        })
        .unwrap();

        assert_eq!(decision.value, 123.45);
        assert_eq!(decision.status, ReadingStatus::Success);
        assert_eq!(decision.text.as_deref(), Some("123.45"));
    }

    #[test]
    fn test_unreadable_yields_placeholder() {
        let decision =
            classify(RecognitionOutcome::Unreadable("<html>".to_string())).unwrap();

        assert_eq!(decision.value, PLACEHOLDER_VALUE);
        assert_eq!(decision.status, ReadingStatus::NeedsManualInput);
        assert!(decision.text.is_none());
    }

    #[test]
    fn test_local_timeout_yields_placeholder() {
        let decision = classify(RecognitionOutcome::TimedOut).unwrap();

        assert_eq!(decision.value, PLACEHOLDER_VALUE);
        assert_eq!(decision.status, ReadingStatus::Timeout);
    }

    #[test]
    fn test_remote_failure_with_timeout_marker_yields_placeholder() {
        let decision = classify(RecognitionOutcome::RemoteFailure {
            status: 504,
            body: "FUNCTION_INVOCATION_TIMEOUT".to_string(),
        })
        .unwrap();

        assert_eq!(decision.value, PLACEHOLDER_VALUE);
        assert_eq!(decision.status, ReadingStatus::Timeout);
    }

    #[test]
    fn test_remote_failure_without_marker_is_terminal() {
        let result = classify(RecognitionOutcome::RemoteFailure {
            status: 500,
            body: "internal error".to_string(),
        });

        assert!(matches!(result, Err(Error::Recognition { status: 500, .. })));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(ReadingStatus::Success.as_str(), "success");
        assert_eq!(ReadingStatus::NeedsManualInput.as_str(), "needsManualInput");
        assert_eq!(ReadingStatus::Timeout.as_str(), "timeout");
    }
}
