//! Ingestion orchestrator
//!
//! Composes the pipeline for one upload: store the image, make exactly one
//! recognition attempt, classify the outcome, commit the decision. The
//! three external calls are strictly sequential; only the recognition call
//! carries its own cancellable deadline. A timeout never rolls back the
//! already-committed image write, so a placeholder row is still persisted
//! and the stored image is not orphaned.

use tracing::{error, info};
use wmtr_common::Result;

use crate::classify::{classify, ReadingStatus};
use crate::AppState;

/// One upload request as seen by the orchestrator
#[derive(Debug)]
pub struct IngestRequest {
    pub owner_id: String,
    pub building_id: String,
    pub room_id: String,
    pub file_name: String,
    pub image_bytes: Vec<u8>,
}

/// Caller-facing result of a reached-decision ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Success,
    NeedsManualInput,
    Timeout,
    /// A decision was reached but the reading row could not be written;
    /// the image is stored and its URL is still returned.
    RecordSaveFailed,
}

impl CommitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStatus::Success => "success",
            CommitStatus::NeedsManualInput => "needsManualInput",
            CommitStatus::Timeout => "timeout",
            CommitStatus::RecordSaveFailed => "recordSaveFailed",
        }
    }
}

impl From<ReadingStatus> for CommitStatus {
    fn from(status: ReadingStatus) -> Self {
        match status {
            ReadingStatus::Success => CommitStatus::Success,
            ReadingStatus::NeedsManualInput => CommitStatus::NeedsManualInput,
            ReadingStatus::Timeout => CommitStatus::Timeout,
        }
    }
}

/// Everything the HTTP layer needs to shape a 200 response
#[derive(Debug)]
pub struct IngestReport {
    pub status: CommitStatus,
    pub image_url: String,
    /// The reading as printed by the recognition service (success only)
    pub result: Option<String>,
    pub reading_id: Option<String>,
    pub message: Option<String>,
}

/// Run one ingestion end to end.
///
/// Errors propagate only for the terminal cases: the image write failed
/// (nothing stored, nothing recorded) or the recognition service failed
/// outright with no timeout signature (image stored, no row written).
pub async fn run(state: &AppState, request: IngestRequest) -> Result<IngestReport> {
    // Store first; there is no point recognizing an unstored image, and a
    // store failure aborts the attempt outright.
    let image_url = state
        .store
        .store(&request.owner_id, &request.image_bytes, &request.file_name)
        .await?;

    // Exactly one recognition attempt, bounded by the configured deadline.
    let outcome = state
        .ocr
        .recognize(request.image_bytes, request.file_name)
        .await;

    let decision = classify(outcome)?;

    let commit = state
        .recorder
        .record(
            &request.owner_id,
            &request.building_id,
            &request.room_id,
            &image_url,
            decision.value,
        )
        .await;

    let report = match commit {
        Ok(reading_id) => {
            info!(
                owner = %request.owner_id,
                status = decision.status.as_str(),
                value = decision.value,
                "Ingestion committed"
            );
            IngestReport {
                status: decision.status.into(),
                image_url,
                result: decision.text,
                reading_id: Some(reading_id),
                message: status_message(decision.status),
            }
        }
        Err(e) => {
            // The image is already durable; report the missing row instead
            // of failing the whole request.
            error!(error = %e, "Failed to save reading row");
            IngestReport {
                status: CommitStatus::RecordSaveFailed,
                image_url,
                result: decision.text,
                reading_id: None,
                message: Some(
                    "Image saved, but the reading could not be recorded".to_string(),
                ),
            }
        }
    };

    Ok(report)
}

fn status_message(status: ReadingStatus) -> Option<String> {
    match status {
        ReadingStatus::Success => None,
        ReadingStatus::NeedsManualInput => Some(
            "Could not read the meter - image saved, please enter the value manually".to_string(),
        ),
        ReadingStatus::Timeout => Some(
            "Recognition timed out - image saved, please enter the value manually".to_string(),
        ),
    }
}
