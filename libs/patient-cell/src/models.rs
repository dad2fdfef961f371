use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// The account columns joined into patient projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub is_active: bool,
}

/// A bare row from the `patients` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub medical_history: Option<String>,
}

/// A patient row with its account embedded via the PostgREST join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    pub medical_history: Option<String>,
    pub user: UserSummary,
}

impl PatientWithUser {
    /// Flattened snake_case projection served to clients.
    pub fn to_response(&self) -> Value {
        json!({
            "id": self.id,
            "first_name": self.user.first_name,
            "last_name": self.user.last_name,
            "email": self.user.email,
            "phone": self.user.phone,
            "date_of_birth": self.user.date_of_birth,
            "address": self.user.address,
            "emergency_contact": self.emergency_contact,
            "emergency_phone": self.emergency_phone,
            "insurance_provider": self.insurance_provider,
            "insurance_number": self.insurance_number,
            "allergies": self.allergies,
            "current_medications": self.current_medications,
            "medical_history": self.medical_history
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}
