use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::{encode_filter_term, PostgrestClient};

use crate::models::{DoctorError, DoctorRow, DoctorWithUser};

const USER_EMBED: &str =
    "user:users!inner(id,first_name,last_name,email,phone,date_of_birth,address,is_active)";

const UPDATABLE_FIELDS: &[(&str, &str)] = &[
    ("specialization", "specialization"),
    ("licenseNumber", "license_number"),
    ("yearsExperience", "years_experience"),
    ("consultationFee", "consultation_fee"),
    ("bio", "bio"),
    ("availableDays", "available_days"),
    ("availableHours", "available_hours"),
];

pub struct DoctorService {
    db: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// List doctors with active accounts, optionally narrowed by a
    /// case-insensitive specialization substring.
    pub async fn list_doctors(
        &self,
        specialization: Option<&str>,
    ) -> Result<Vec<DoctorWithUser>, DoctorError> {
        let mut path = format!(
            "/rest/v1/doctors?select=*,{}&user.is_active=eq.true",
            USER_EMBED
        );

        if let Some(term) = specialization.map(str::trim).filter(|t| !t.is_empty()) {
            debug!("Filtering doctors by specialization '{}'", term);
            path.push_str(&format!(
                "&specialization=ilike.*{}*",
                encode_filter_term(term)
            ));
        }

        self.db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<DoctorWithUser, DoctorError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=*,{}",
            doctor_id, USER_EMBED
        );
        let rows: Vec<DoctorWithUser> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn get_doctor_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DoctorRow>, DoctorError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}&limit=1", user_id);
        let rows: Vec<DoctorRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        updates: &Map<String, Value>,
    ) -> Result<(), DoctorError> {
        let changes = build_patch_body(updates);
        if changes.is_empty() {
            return Ok(());
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let updated: Vec<Value> = self
            .db
            .patch_returning(&path, Value::Object(changes))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if updated.is_empty() {
            return Err(DoctorError::NotFound);
        }

        Ok(())
    }
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
    use serde_json::json;

    #[test]
    fn patch_body_maps_camel_case_keys() {
        let updates = json!({
            "licenseNumber": "MD99999",
            "yearsExperience": 20,
            "consultationFee": 175.0,
            "user_id": "should-not-pass-through"
        });

        let changes = build_patch_body(updates.as_object().unwrap());

        assert_eq!(changes.len(), 3);
        assert_eq!(changes["license_number"], json!("MD99999"));
        assert_eq!(changes["years_experience"], json!(20));
        assert_eq!(changes["consultation_fee"], json!(175.0));
        assert!(!changes.contains_key("user_id"));
    }
}
