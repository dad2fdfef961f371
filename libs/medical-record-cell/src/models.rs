use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// A row from the `medical_records` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub visual_acuity_right: Option<String>,
    pub visual_acuity_left: Option<String>,
    pub eye_pressure_right: Option<String>,
    pub eye_pressure_left: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRef {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub user: NameRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordWithNames {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub visual_acuity_right: Option<String>,
    pub visual_acuity_left: Option<String>,
    pub eye_pressure_right: Option<String>,
    pub eye_pressure_left: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub patient: ParticipantRef,
    pub doctor: ParticipantRef,
}

impl MedicalRecordWithNames {
    pub fn to_response(&self) -> Value {
        json!({
            "id": self.id,
            "patient_id": self.patient_id,
            "doctor_id": self.doctor_id,
            "patient_first_name": self.patient.user.first_name,
            "patient_last_name": self.patient.user.last_name,
            "doctor_first_name": self.doctor.user.first_name,
            "doctor_last_name": self.doctor.user.last_name,
            "visit_date": self.visit_date,
            "chief_complaint": self.chief_complaint,
            "diagnosis": self.diagnosis,
            "treatment_plan": self.treatment_plan,
            "prescription": self.prescription,
            "follow_up_date": self.follow_up_date,
            "visual_acuity_right": self.visual_acuity_right,
            "visual_acuity_left": self.visual_acuity_left,
            "eye_pressure_right": self.eye_pressure_right,
            "eye_pressure_left": self.eye_pressure_left,
            "notes": self.notes,
            "created_at": self.created_at
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicalRecordRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub visual_acuity_right: Option<String>,
    pub visual_acuity_left: Option<String>,
    pub eye_pressure_right: Option<String>,
    pub eye_pressure_left: Option<String>,
    pub notes: Option<String>,
}

/// Effective list filters after role substitution.
#[derive(Debug, Clone, Default)]
pub struct RecordFilters {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Medical record not found")]
    NotFound,

    #[error("Patient or Doctor not found")]
    ParticipantNotFound,

    #[error("Database error: {0}")]
    Database(String),
}
