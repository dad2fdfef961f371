use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    AppointmentError, AppointmentFilters, AppointmentRow, AppointmentStatus,
    AppointmentWithNames, BookAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;

const NAMES_EMBED: &str = "patient:patients!inner(user:users!inner(first_name,last_name)),doctor:doctors!inner(user:users!inner(first_name,last_name))";

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

pub struct BookingService {
    db: PostgrestClient,
    conflict: ConflictDetectionService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
            conflict: ConflictDetectionService::new(config),
        }
    }

    pub async fn list_appointments(
        &self,
        filters: AppointmentFilters,
    ) -> Result<Vec<AppointmentWithNames>, AppointmentError> {
        let path = list_query_path(&filters);

        self.db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentRow, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<AppointmentRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Book a slot. The application-level conflict check is backed by the
    /// partial unique index on (doctor, date, time) for non-cancelled rows,
    /// so a racing insert loses with the same slot-taken error.
    pub async fn create_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentRow, AppointmentError> {
        if self
            .conflict
            .has_conflict(
                request.doctor_id,
                request.appointment_date,
                request.appointment_time,
                None,
            )
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        if !self.row_exists("patients", request.patient_id).await?
            || !self.row_exists("doctors", request.doctor_id).await?
        {
            return Err(AppointmentError::ParticipantNotFound);
        }

        debug!(
            "Booking appointment for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        let now = Utc::now();
        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date,
            "appointment_time": request.appointment_time,
            "duration": request.duration,
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now
        });

        self.db.insert_returning("appointments", row).await.map_err(|e| {
            let msg = e.to_string();
            if msg.starts_with("Conflict") {
                AppointmentError::SlotTaken
            } else {
                AppointmentError::Database(msg)
            }
        })
    }

    /// Apply an open update payload to an existing appointment. Recognized
    /// keys are applied, unknown keys and unparseable status values are
    /// ignored. When the resulting slot is active and was touched by the
    /// payload, the slot must still be free (the row itself excluded).
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        updates: &Map<String, Value>,
    ) -> Result<(), AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        let mut changes = Map::new();
        let mut new_date = current.appointment_date;
        let mut new_time = current.appointment_time;
        let mut new_status = current.status;

        if let Some(value) = updates.get("appointmentDate") {
            new_date = serde_json::from_value(value.clone())
                .map_err(|_| AppointmentError::Validation("Invalid appointmentDate".to_string()))?;
            changes.insert("appointment_date".to_string(), json!(new_date));
        }
        if let Some(value) = updates.get("appointmentTime") {
            new_time = serde_json::from_value(value.clone())
                .map_err(|_| AppointmentError::Validation("Invalid appointmentTime".to_string()))?;
            changes.insert("appointment_time".to_string(), json!(new_time));
        }
        if let Some(value) = updates.get("duration") {
            changes.insert("duration".to_string(), value.clone());
        }
        if let Some(status) = updates
            .get("status")
            .and_then(Value::as_str)
            .and_then(AppointmentStatus::from_input)
        {
            new_status = status;
            changes.insert("status".to_string(), json!(status));
        }
        if let Some(value) = updates.get("reason") {
            changes.insert("reason".to_string(), value.clone());
        }
        if let Some(value) = updates.get("notes") {
            changes.insert("notes".to_string(), value.clone());
        }

        if changes.is_empty() {
            return Ok(());
        }

        let slot_touched = changes.contains_key("appointment_date")
            || changes.contains_key("appointment_time")
            || changes.contains_key("status");

        if new_status != AppointmentStatus::Cancelled
            && slot_touched
            && self
                .conflict
                .has_conflict(current.doctor_id, new_date, new_time, Some(appointment_id))
                .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        changes.insert("updated_at".to_string(), json!(Utc::now()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Value> = self
            .db
            .patch_returning(&path, Value::Object(changes))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        if updated.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Ok(())
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        // Existence is checked first so a missing row surfaces as 404
        self.get_appointment(appointment_id).await?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.db
            .execute(Method::DELETE, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    /// Resolve the patient row id owned by an authenticated account.
    pub async fn find_patient_id_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, AppointmentError> {
        self.find_profile_id("patients", user_id).await
    }

    pub async fn find_doctor_id_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, AppointmentError> {
        self.find_profile_id("doctors", user_id).await
    }

    async fn find_profile_id(
        &self,
        table: &str,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, AppointmentError> {
        let path = format!("/rest/v1/{}?user_id=eq.{}&select=id&limit=1", table, user_id);
        let rows: Vec<IdRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn row_exists(&self, table: &str, id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=id&limit=1", table, id);
        let rows: Vec<IdRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }
}

fn list_query_path(filters: &AppointmentFilters) -> String {
    let mut path = format!(
        "/rest/v1/appointments?select=*,{}&order=appointment_date.asc,appointment_time.asc",
        NAMES_EMBED
    );

    if let Some(date) = filters.date {
        path.push_str(&format!("&appointment_date=eq.{}", date));
    }
    if let Some(doctor_id) = filters.doctor_id {
        path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
    }
    if let Some(patient_id) = filters.patient_id {
        path.push_str(&format!("&patient_id=eq.{}", patient_id));
    }
    if let Some(status) = filters.status {
        path.push_str(&format!("&status=eq.{}", status));
    }

    path
}
