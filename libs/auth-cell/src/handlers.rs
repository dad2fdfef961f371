use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;

use crate::models::{AuthError, LoginRequest, RegisterRequest};
use crate::services::account::AccountService;

fn map_auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::InvalidCredentials | AuthError::UsernameTaken | AuthError::EmailTaken => {
            AppError::BadRequest(err.to_string())
        }
        AuthError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Login attempt for {}", request.username);

    let service = AccountService::new(&config);

    let user = service
        .authenticate(&request.username, &request.password)
        .await
        .map_err(map_auth_error)?;

    let auth_user = AuthUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
    };

    let token = issue_token(&auth_user, &config.jwt_secret).map_err(AppError::Internal)?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
            "first_name": user.first_name,
            "last_name": user.last_name
        }
    })))
}

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Registering new {} account: {}", request.role, request.username);

    let service = AccountService::new(&config);

    let user = service.register(request).await.map_err(map_auth_error)?;

    Ok(Json(json!({
        "message": "User registered successfully",
        "userId": user.id
    })))
}
