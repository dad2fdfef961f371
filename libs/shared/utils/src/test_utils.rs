use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: "http://localhost:54321".to_string(),
            database_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database_url(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_service_key: self.database_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: email.split('@').next().unwrap_or("test").to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows matching the shapes the cell services deserialize.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn user_row(id: Uuid, username: &str, email: &str, role: &str, password_hash: &str) -> Value {
        json!({
            "id": id,
            "username": username,
            "email": email,
            "password_hash": password_hash,
            "role": role,
            "first_name": "Test",
            "last_name": "User",
            "phone": null,
            "date_of_birth": null,
            "address": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn user_summary(user_id: Uuid, first_name: &str, last_name: &str, email: &str) -> Value {
        json!({
            "id": user_id,
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
            "phone": "+1234567890",
            "date_of_birth": "1990-01-01",
            "address": null,
            "is_active": true
        })
    }

    pub fn patient_row(patient_id: Uuid, user_id: Uuid) -> Value {
        json!({
            "id": patient_id,
            "user_id": user_id,
            "emergency_contact": null,
            "emergency_phone": null,
            "insurance_provider": "VHI",
            "insurance_number": "INS-100",
            "allergies": null,
            "current_medications": null,
            "medical_history": null
        })
    }

    pub fn patient_row_with_user(patient_id: Uuid, user_id: Uuid, first_name: &str, last_name: &str) -> Value {
        let mut row = Self::patient_row(patient_id, user_id);
        row["user"] = Self::user_summary(user_id, first_name, last_name, "patient@example.com");
        row
    }

    pub fn doctor_row(doctor_id: Uuid, user_id: Uuid) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "specialization": "Ophthalmology",
            "license_number": "MD12345",
            "years_experience": 15,
            "consultation_fee": 150.00,
            "bio": "Experienced ophthalmologist",
            "available_days": "Mon,Tue,Wed,Thu,Fri",
            "available_hours": "09:00-17:00"
        })
    }

    pub fn doctor_row_with_user(doctor_id: Uuid, user_id: Uuid, first_name: &str, last_name: &str) -> Value {
        let mut row = Self::doctor_row(doctor_id, user_id);
        row["user"] = Self::user_summary(user_id, first_name, last_name, "doctor@example.com");
        row
    }

    pub fn appointment_row(appointment_id: Uuid, patient_id: Uuid, doctor_id: Uuid) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": "2025-03-10",
            "appointment_time": "09:00:00",
            "duration": 30,
            "status": "scheduled",
            "reason": "Annual eye exam",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row_with_names(appointment_id: Uuid, patient_id: Uuid, doctor_id: Uuid) -> Value {
        let mut row = Self::appointment_row(appointment_id, patient_id, doctor_id);
        row["patient"] = json!({ "user": { "first_name": "Pat", "last_name": "Example" } });
        row["doctor"] = json!({ "user": { "first_name": "John", "last_name": "Smith" } });
        row
    }

    pub fn medical_record_row(record_id: Uuid, patient_id: Uuid, doctor_id: Uuid) -> Value {
        json!({
            "id": record_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_id": null,
            "visit_date": "2025-03-10",
            "chief_complaint": "Blurry vision",
            "diagnosis": "Myopia",
            "treatment_plan": "Corrective lenses",
            "prescription": "-1.25 both eyes",
            "follow_up_date": null,
            "visual_acuity_right": "20/40",
            "visual_acuity_left": "20/30",
            "eye_pressure_right": "14",
            "eye_pressure_left": "15",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn medical_record_row_with_names(record_id: Uuid, patient_id: Uuid, doctor_id: Uuid) -> Value {
        let mut row = Self::medical_record_row(record_id, patient_id, doctor_id);
        row["patient"] = json!({ "user": { "first_name": "Pat", "last_name": "Example" } });
        row["doctor"] = json!({ "user": { "first_name": "John", "last_name": "Smith" } });
        row
    }
}
