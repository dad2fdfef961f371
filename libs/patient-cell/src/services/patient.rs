use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::{encode_filter_term, PostgrestClient};

use crate::models::{PatientError, PatientRow, PatientWithUser};

const USER_EMBED: &str =
    "user:users!inner(id,first_name,last_name,email,phone,date_of_birth,address,is_active)";

/// Update-payload keys accepted from clients, with their column names.
/// Anything else in the payload is dropped without comment.
const UPDATABLE_FIELDS: &[(&str, &str)] = &[
    ("emergencyContact", "emergency_contact"),
    ("emergencyPhone", "emergency_phone"),
    ("insuranceProvider", "insurance_provider"),
    ("insuranceNumber", "insurance_number"),
    ("allergies", "allergies"),
    ("currentMedications", "current_medications"),
    ("medicalHistory", "medical_history"),
];

pub struct PatientService {
    db: PostgrestClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// List patients, optionally filtered by a case-insensitive name/email
    /// search. Pagination is applied after the filter.
    pub async fn list_patients(
        &self,
        search: Option<&str>,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<PatientWithUser>, PatientError> {
        let mut path = format!("/rest/v1/patients?select=*,{}", USER_EMBED);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            debug!("Searching patients for '{}'", term);
            let term = encode_filter_term(term);
            path.push_str(&format!(
                "&user.or=(first_name.ilike.*{term}*,last_name.ilike.*{term}*,email.ilike.*{term}*)"
            ));
        }

        path.push_str(&format!("&limit={}&offset={}", limit, offset));

        self.db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<PatientWithUser, PatientError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=*,{}",
            patient_id, USER_EMBED
        );
        let rows: Vec<PatientWithUser> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    /// Resolve the patient row linked to an authenticated account, if any.
    pub async fn get_patient_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PatientRow>, PatientError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}&limit=1", user_id);
        let rows: Vec<PatientRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Apply the recognized keys of an open update payload. Unknown keys are
    /// silently ignored; an effectively empty payload is a no-op.
    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        updates: &Map<String, Value>,
    ) -> Result<(), PatientError> {
        let changes = build_patch_body(updates);
        if changes.is_empty() {
            return Ok(());
        }

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let updated: Vec<Value> = self
            .db
            .patch_returning(&path, Value::Object(changes))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        if updated.is_empty() {
            return Err(PatientError::NotFound);
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
    fn patch_body_keeps_recognized_keys_only() {
        let updates = json!({
            "emergencyContact": "Jane Doe",
            "insuranceNumber": "INS-42",
            "role": "admin",
            "unknown_key": true
        });

        let changes = build_patch_body(updates.as_object().unwrap());

        assert_eq!(changes.len(), 2);
        assert_eq!(changes["emergency_contact"], json!("Jane Doe"));
        assert_eq!(changes["insurance_number"], json!("INS-42"));
        assert!(!changes.contains_key("role"));
    }

    #[test]
    fn empty_payload_produces_empty_patch() {
        let updates = json!({ "somethingElse": 1 });
        assert!(build_patch_body(updates.as_object().unwrap()).is_empty());
    }
}
