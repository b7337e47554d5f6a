//! Meter reading endpoints: upload, manual correction, history
//!
//! Every reached-decision upload returns HTTP 200 with a semantic status
//! field; recognition-side failures are absorbed rather than surfaced, so
//! the photo is never lost and the client always has a path to complete
//! the record. Only validation, auth, and image-store failures produce
//! non-200 responses.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;
use wmtr_common::db::models::MeterReading;
use wmtr_common::Error;

use crate::api::UserId;
use crate::ingest::{self, CommitStatus, IngestRequest};
use crate::AppState;

/// POST /api/read-meter
///
/// Multipart upload: `file` (the photograph), `buildingId`, `roomId`.
/// Runs the full ingestion pipeline and returns one of the reached-decision
/// response shapes, or 500 if the image could not be stored at all.
pub async fn read_meter(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut image: Option<(Vec<u8>, String)> = None;
    let mut building_id: Option<String> = None;
    let mut room_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("Cannot read file field: {}", e)))?;
                image = Some((bytes.to_vec(), file_name));
            }
            Some("buildingId") => {
                building_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            Some("roomId") => {
                room_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (image_bytes, file_name) =
        image.ok_or_else(|| ApiError::MissingField("file".to_string()))?;
    let building_id = building_id.ok_or_else(|| ApiError::MissingField("buildingId".to_string()))?;
    let room_id = room_id.ok_or_else(|| ApiError::MissingField("roomId".to_string()))?;

    if image_bytes.is_empty() {
        return Err(ApiError::InvalidInput("Empty image upload".to_string()));
    }

    let report = ingest::run(
        &state,
        IngestRequest {
            owner_id: user_id,
            building_id,
            room_id,
            file_name,
            image_bytes,
        },
    )
    .await?;

    let mut body = json!({
        "success": report.status == CommitStatus::Success,
        "imageUrl": report.image_url,
    });

    if let Some(result) = report.result {
        body["result"] = json!(result);
    }
    if let Some(reading_id) = report.reading_id {
        body["readingId"] = json!(reading_id);
    }
    if report.status != CommitStatus::Success {
        body["status"] = json!(report.status.as_str());
    }
    if let Some(message) = report.message {
        body["message"] = json!(message);
    }

    Ok(Json(body))
}

/// Manual correction request. `value` tolerates either a JSON number or a
/// numeric string, matching what meter-reading clients actually send.
#[derive(Debug, Deserialize)]
pub struct CorrectRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub value: Value,
}

/// POST /api/readings/correct
///
/// Applies a human-supplied value to the most recent reading for the given
/// image URL. Updates in place; repeating the same correction is a no-op.
pub async fn correct_reading(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(request): Json<CorrectRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.image_url.is_empty() {
        return Err(ApiError::MissingField("imageUrl".to_string()));
    }

    let value = parse_value(&request.value)
        .ok_or_else(|| ApiError::InvalidInput("value must be numeric".to_string()))?;

    state
        .recorder
        .correct(&user_id, &request.image_url, value)
        .await?;

    Ok(Json(json!({
        "success": true,
        "imageUrl": request.image_url,
        "value": value,
    })))
}

fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Query filters for the reading history
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "buildingId")]
    pub building_id: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

/// GET /api/readings
///
/// Newest-first reading history for the authenticated user, optionally
/// filtered by building and/or room.
pub async fn list_readings(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MeterReading>>, ApiError> {
    let readings = state
        .recorder
        .list(&user_id, query.building_id.as_deref(), query.room_id.as_deref())
        .await?;

    Ok(Json(readings))
}

/// Reading API errors
#[derive(Debug)]
pub enum ApiError {
    MissingField(String),
    InvalidInput(String),
    NotFound(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::InvalidInput(msg),
            Error::Storage(msg) => {
                error!("Image store failure: {}", msg);
                ApiError::Internal("Failed to upload image".to_string())
            }
            Error::Recognition { status, body } => {
                error!(status = status, body = %body, "Recognition service failure");
                ApiError::Internal("Recognition service failed".to_string())
            }
            other => {
                // Never leak internals to the caller
                error!("Unexpected error: {}", other);
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingField(field) => {
                (StatusCode::BAD_REQUEST, format!("Missing required field: {}", field))
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_number_and_numeric_string() {
        assert_eq!(parse_value(&json!(88.0)), Some(88.0));
        assert_eq!(parse_value(&json!("88.0")), Some(88.0));
        assert_eq!(parse_value(&json!(" 123.45 ")), Some(123.45));
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        assert_eq!(parse_value(&json!("not a number")), None);
        assert_eq!(parse_value(&json!(null)), None);
        assert_eq!(parse_value(&json!({"v": 1})), None);
        assert_eq!(parse_value(&json!("NaN")), None);
    }
}
