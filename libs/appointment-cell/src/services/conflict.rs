use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::AppointmentError;

/// Exact-slot conflict detection: a slot is taken when a non-cancelled
/// appointment exists for the same doctor, date, and time. Durations and
/// partial overlaps are deliberately not considered.
pub struct ConflictDetectionService {
    db: PostgrestClient,
}

impl ConflictDetectionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        let path = conflict_query_path(doctor_id, date, time, exclude_appointment_id);
        debug!("Checking slot conflict for doctor {} at {} {}", doctor_id, date, time);

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        if !rows.is_empty() {
            warn!(
                "Slot conflict for doctor {} at {} {}",
                doctor_id, date, time
            );
        }

        Ok(!rows.is_empty())
    }
}

fn conflict_query_path(
    doctor_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    exclude_appointment_id: Option<Uuid>,
) -> String {
    let mut path = format!(
        "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=neq.cancelled&select=id&limit=1",
        doctor_id, date, time
    );
    if let Some(exclude) = exclude_appointment_id {
        path.push_str(&format!("&id=neq.{}", exclude));
    }
    path
}
