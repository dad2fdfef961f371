use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::models::DoctorError;
use crate::services::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialization: Option<String>,
}

fn map_doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound(err.to_string()),
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let service = DoctorService::new(&config);

    let doctors = service
        .list_doctors(query.specialization.as_deref())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(doctors.iter().map(|d| d.to_response()).collect()))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service
        .get_doctor(doctor_id)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(doctor.to_response()))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    if user.role == Role::Patient {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let service = DoctorService::new(&config);

    let doctor = service
        .get_doctor(doctor_id)
        .await
        .map_err(map_doctor_error)?;

    // A doctor can only edit their own profile; admins can edit any
    if user.role == Role::Doctor && doctor.user.id != user.id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let updates = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".to_string()))?;

    service
        .update_doctor(doctor_id, updates)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(serde_json::json!({
        "message": "Doctor profile updated successfully"
    })))
}
