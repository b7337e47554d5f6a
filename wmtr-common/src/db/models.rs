//! Row types shared between the API crate and its tests

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// One recorded observation of a physical meter.
///
/// `meter_value` of 0 is the placeholder written when no machine-read value
/// was available; the row is then completed by a manual correction keyed on
/// `(user_id, image_url)`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MeterReading {
    pub guid: String,
    pub user_id: String,
    pub building_id: String,
    pub room_id: String,
    pub image_url: String,
    pub meter_value: f64,
    pub created_at: NaiveDateTime,
}

impl MeterReading {
    /// True when this row still holds the placeholder value
    pub fn is_pending_correction(&self) -> bool {
        self.meter_value == 0.0
    }
}

/// An authenticated session, provisioned out-of-band.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}
