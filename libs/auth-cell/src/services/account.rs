use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::{encode_filter_term, PostgrestClient};
use shared_models::auth::Role;
use shared_utils::password::{hash_password, verify_password};

use crate::models::{AuthError, RegisterRequest, UserRow};

pub struct AccountService {
    db: PostgrestClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRow>, AuthError> {
        let path = format!(
            "/rest/v1/users?username=eq.{}&limit=1",
            encode_filter_term(username)
        );
        let rows: Vec<UserRow> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let path = format!(
            "/rest/v1/users?email=eq.{}&select=id&limit=1",
            encode_filter_term(email)
        );
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    /// Username/password check for login. Inactive accounts and unknown
    /// usernames fail the same way as a wrong password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserRow, AuthError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            debug!("Login attempt for inactive account: {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Database(e.to_string())),
        }
    }

    /// Create the base account plus the role-specific profile row. A bare
    /// patients/doctors row is created for those roles; admins get none.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserRow, AuthError> {
        if self.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.email_exists(&request.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let user = self.create_user(&request).await?;

        match user.role {
            Role::Patient => {
                self.create_patient_profile(user.id).await?;
            }
            Role::Doctor => {
                self.create_doctor_profile(user.id).await?;
            }
            Role::Admin => {}
        }

        Ok(user)
    }

    pub async fn create_user(&self, request: &RegisterRequest) -> Result<UserRow, AuthError> {
        debug!("Creating user account: {}", request.username);

        let password_hash =
            hash_password(&request.password).map_err(|e| AuthError::Database(e.to_string()))?;

        let row = json!({
            "username": request.username,
            "email": request.email,
            "password_hash": password_hash,
            "role": request.role,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "phone": request.phone,
            "date_of_birth": request.date_of_birth,
            "address": request.address,
            "is_active": true
        });

        self.db
            .insert_returning("users", row)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))
    }

    pub async fn create_patient_profile(&self, user_id: Uuid) -> Result<(), AuthError> {
        let row = json!({ "user_id": user_id });
        let _: Value = self
            .db
            .insert_returning("patients", row)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn create_doctor_profile(&self, user_id: Uuid) -> Result<(), AuthError> {
        let row = json!({ "user_id": user_id });
        let _: Value = self
            .db
            .insert_returning("doctors", row)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn db(&self) -> &PostgrestClient {
        &self.db
    }
}
