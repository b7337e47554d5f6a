//! Reading recorder
//!
//! Owns every write to the `meter_readings` table: the initial commit of an
//! ingestion decision (value or placeholder) and the later manual
//! correction keyed by `(user_id, image_url)`.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use wmtr_common::db::models::MeterReading;
use wmtr_common::{Error, Result};

#[derive(Debug, Clone)]
pub struct ReadingRecorder {
    db: SqlitePool,
}

impl ReadingRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Commit one reading row tied to a stored image. Returns the new
    /// reading id.
    pub async fn record(
        &self,
        owner_id: &str,
        building_id: &str,
        room_id: &str,
        image_url: &str,
        value: f64,
    ) -> Result<String> {
        let guid = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO meter_readings (guid, user_id, building_id, room_id, image_url, meter_value)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&guid)
        .bind(owner_id)
        .bind(building_id)
        .bind(room_id)
        .bind(image_url)
        .bind(value)
        .execute(&self.db)
        .await?;

        info!(reading = %guid, value = value, "Recorded meter reading");
        Ok(guid)
    }

    /// Apply a manual value to the most recent reading for this image.
    ///
    /// Updates in place; no new row is created. Last write wins when two
    /// corrections race for the same image.
    pub async fn correct(&self, owner_id: &str, image_url: &str, new_value: f64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE meter_readings SET meter_value = ?
             WHERE guid = (
                 SELECT guid FROM meter_readings
                 WHERE user_id = ? AND image_url = ?
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1
             )",
        )
        .bind(new_value)
        .bind(owner_id)
        .bind(image_url)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "No reading for image {}",
                image_url
            )));
        }

        info!(image_url = %image_url, value = new_value, "Applied manual correction");
        Ok(())
    }

    /// Newest-first reading history for one owner, optionally narrowed to
    /// one building and/or room.
    pub async fn list(
        &self,
        owner_id: &str,
        building_id: Option<&str>,
        room_id: Option<&str>,
    ) -> Result<Vec<MeterReading>> {
        let mut sql = String::from("SELECT * FROM meter_readings WHERE user_id = ?");
        if building_id.is_some() {
            sql.push_str(" AND building_id = ?");
        }
        if room_id.is_some() {
            sql.push_str(" AND room_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut query = sqlx::query_as::<_, MeterReading>(&sql).bind(owner_id);
        if let Some(building_id) = building_id {
            query = query.bind(building_id);
        }
        if let Some(room_id) = room_id {
            query = query.bind(room_id);
        }

        Ok(query.fetch_all(&self.db).await?)
    }
}
