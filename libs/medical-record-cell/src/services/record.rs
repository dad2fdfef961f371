use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    CreateMedicalRecordRequest, MedicalRecordRow, MedicalRecordWithNames, RecordError,
    RecordFilters,
};

const NAMES_EMBED: &str = "patient:patients!inner(user:users!inner(first_name,last_name)),doctor:doctors!inner(user:users!inner(first_name,last_name))";

/// Clinical fields a doctor may change after the fact. The record identity
/// (patient, doctor, visit date) and created_at are never patched.
const UPDATABLE_FIELDS: &[(&str, &str)] = &[
    ("chiefComplaint", "chief_complaint"),
    ("diagnosis", "diagnosis"),
    ("treatmentPlan", "treatment_plan"),
    ("prescription", "prescription"),
    ("followUpDate", "follow_up_date"),
    ("visualAcuityRight", "visual_acuity_right"),
    ("visualAcuityLeft", "visual_acuity_left"),
    ("eyePressureRight", "eye_pressure_right"),
    ("eyePressureLeft", "eye_pressure_left"),
    ("notes", "notes"),
];

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

pub struct MedicalRecordService {
    db: PostgrestClient,
}

impl MedicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list_records(
        &self,
        filters: RecordFilters,
    ) -> Result<Vec<MedicalRecordWithNames>, RecordError> {
        let path = list_query_path(&filters);

        self.db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| RecordError::Database(e.to_string()))
    }

    pub async fn get_record(&self, record_id: Uuid) -> Result<MedicalRecordRow, RecordError> {
        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let rows: Vec<MedicalRecordRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| RecordError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(RecordError::NotFound)
    }

    pub async fn create_record(
        &self,
        request: CreateMedicalRecordRequest,
    ) -> Result<MedicalRecordRow, RecordError> {
        if !self.row_exists("patients", request.patient_id).await?
            || !self.row_exists("doctors", request.doctor_id).await?
        {
            return Err(RecordError::ParticipantNotFound);
        }

        debug!(
            "Creating medical record for patient {} (doctor {})",
            request.patient_id, request.doctor_id
        );

        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_id": request.appointment_id,
            "visit_date": request.visit_date,
            "chief_complaint": request.chief_complaint,
            "diagnosis": request.diagnosis,
            "treatment_plan": request.treatment_plan,
            "prescription": request.prescription,
            "follow_up_date": request.follow_up_date,
            "visual_acuity_right": request.visual_acuity_right,
            "visual_acuity_left": request.visual_acuity_left,
            "eye_pressure_right": request.eye_pressure_right,
            "eye_pressure_left": request.eye_pressure_left,
            "notes": request.notes,
            "created_at": Utc::now()
        });

        self.db
            .insert_returning("medical_records", row)
            .await
            .map_err(|e| RecordError::Database(e.to_string()))
    }

    pub async fn update_record(
        &self,
        record_id: Uuid,
        updates: &Map<String, Value>,
    ) -> Result<(), RecordError> {
        let changes = build_patch_body(updates);
        if changes.is_empty() {
            return Ok(());
        }

        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let updated: Vec<Value> = self
            .db
            .patch_returning(&path, Value::Object(changes))
            .await
            .map_err(|e| RecordError::Database(e.to_string()))?;

        if updated.is_empty() {
            return Err(RecordError::NotFound);
        }

        Ok(())
    }

    pub async fn find_patient_id_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, RecordError> {
        self.find_profile_id("patients", user_id).await
    }

    pub async fn find_doctor_id_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, RecordError> {
        self.find_profile_id("doctors", user_id).await
    }

    async fn find_profile_id(
        &self,
        table: &str,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, RecordError> {
        let path = format!("/rest/v1/{}?user_id=eq.{}&select=id&limit=1", table, user_id);
        let rows: Vec<IdRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn row_exists(&self, table: &str, id: Uuid) -> Result<bool, RecordError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=id&limit=1", table, id);
        let rows: Vec<IdRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }
}

fn list_query_path(filters: &RecordFilters) -> String {
    let mut path = format!(
        "/rest/v1/medical_records?select=*,{}&order=visit_date.desc",
        NAMES_EMBED
    );

    if let Some(patient_id) = filters.patient_id {
        path.push_str(&format!("&patient_id=eq.{}", patient_id));
    }
    if let Some(doctor_id) = filters.doctor_id {
        path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
    }
    if let Some(start) = filters.start_date {
        path.push_str(&format!("&visit_date=gte.{}", start));
    }
    if let Some(end) = filters.end_date {
        path.push_str(&format!("&visit_date=lte.{}", end));
    }

    path
}

fn build_patch_body(updates: &Map<String, Value>) -> Map<String, Value> {
    let mut changes = Map::new();
    for (key, column) in UPDATABLE_FIELDS {
        if let Some(value) = updates.get(*key) {
            changes.insert((*column).to_string(), value.clone());
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn date_range_filters_bound_the_visit_date() {
        let filters = RecordFilters {
            patient_id: None,
            doctor_id: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
        };

        let path = list_query_path(&filters);
        assert!(path.contains("visit_date=gte.2025-01-01"));
        assert!(path.contains("visit_date=lte.2025-06-30"));
        assert!(path.contains("order=visit_date.desc"));
    }

    #[test]
    fn patch_body_never_touches_identity_or_created_at() {
        let updates = json!({
            "diagnosis": "Glaucoma",
            "createdAt": "2030-01-01T00:00:00Z",
            "patientId": Uuid::new_v4(),
            "visitDate": "2030-01-01"
        });

        let changes = build_patch_body(updates.as_object().unwrap());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes["diagnosis"], json!("Glaucoma"));
    }
}
