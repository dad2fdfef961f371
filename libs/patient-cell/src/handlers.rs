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

use crate::models::PatientError;
use crate::services::PatientService;

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn map_patient_error(err: PatientError) -> AppError {
    match err {
        PatientError::NotFound => AppError::NotFound(err.to_string()),
        PatientError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    // Patients may not browse the register
    if user.role == Role::Patient {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let service = PatientService::new(&config);

    let patients = service
        .list_patients(
            query.search.as_deref(),
            query.limit.unwrap_or(50).max(0),
            query.offset.unwrap_or(0).max(0),
        )
        .await
        .map_err(map_patient_error)?;

    Ok(Json(patients.iter().map(|p| p.to_response()).collect()))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);

    let patient = service
        .get_patient(patient_id)
        .await
        .map_err(map_patient_error)?;

    // A patient can only read their own chart
    if user.role == Role::Patient && patient.user.id != user.id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(patient.to_response()))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);

    let patient = service
        .get_patient(patient_id)
        .await
        .map_err(map_patient_error)?;

    if user.role == Role::Patient && patient.user.id != user.id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let updates = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".to_string()))?;

    service
        .update_patient(patient_id, updates)
        .await
        .map_err(map_patient_error)?;

    Ok(Json(serde_json::json!({
        "message": "Patient updated successfully"
    })))
}
