use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::auth::Role;

use crate::models::RegisterRequest;
use crate::services::account::AccountService;

/// Seed the default admin and doctor accounts at startup when absent.
/// Mirrors the clinic's bootstrap expectations: a working login exists on a
/// fresh database without any manual setup.
pub async fn seed_default_accounts(config: &AppConfig) -> Result<()> {
    let service = AccountService::new(config);

    if service.find_by_username("admin").await?.is_none() {
        info!("Seeding default admin account");
        service
            .create_user(&RegisterRequest {
                username: "admin".to_string(),
                email: "admin@eyecare.com".to_string(),
                password: "admin123".to_string(),
                role: Role::Admin,
                first_name: "System".to_string(),
                last_name: "Administrator".to_string(),
                phone: Some("+1234567890".to_string()),
                date_of_birth: None,
                address: None,
            })
            .await?;
    }

    if service.find_by_username("dr.smith").await?.is_none() {
        info!("Seeding default doctor account");
        let user = service
            .create_user(&RegisterRequest {
                username: "dr.smith".to_string(),
                email: "dr.smith@eyecare.com".to_string(),
                password: "doctor123".to_string(),
                role: Role::Doctor,
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                phone: Some("+1234567891".to_string()),
                date_of_birth: None,
                address: None,
            })
            .await?;

        let doctor = json!({
            "user_id": user.id,
            "specialization": "Ophthalmology",
            "license_number": "MD12345",
            "years_experience": 15,
            "consultation_fee": 150.00,
            "bio": "Experienced ophthalmologist specializing in retinal diseases and cataract surgery."
        });
        let _: Value = service.db().insert_returning("doctors", doctor).await?;
    }

    Ok(())
}
