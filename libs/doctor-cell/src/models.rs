use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

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

/// A bare row from the `doctors` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub bio: Option<String>,
    pub available_days: String,
    pub available_hours: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub bio: Option<String>,
    pub available_days: String,
    pub available_hours: String,
    pub user: UserSummary,
}

impl DoctorWithUser {
    pub fn to_response(&self) -> Value {
        json!({
            "id": self.id,
            "first_name": self.user.first_name,
            "last_name": self.user.last_name,
            "email": self.user.email,
            "phone": self.user.phone,
            "specialization": self.specialization,
            "license_number": self.license_number,
            "years_experience": self.years_experience,
            "consultation_fee": self.consultation_fee,
            "bio": self.bio,
            "available_days": self.available_days,
            "available_hours": self.available_hours
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}
