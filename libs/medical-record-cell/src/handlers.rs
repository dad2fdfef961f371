use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::models::{CreateMedicalRecordRequest, RecordError, RecordFilters};
use crate::services::MedicalRecordService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn map_record_error(err: RecordError) -> AppError {
    match err {
        RecordError::NotFound => AppError::NotFound(err.to_string()),
        RecordError::ParticipantNotFound => AppError::BadRequest(err.to_string()),
        RecordError::Database(msg) => AppError::Database(msg),
    }
}

async fn scoped_filters(
    service: &MedicalRecordService,
    user: &AuthUser,
    query: RecordListQuery,
) -> Result<Option<RecordFilters>, RecordError> {
    let filters = RecordFilters {
        patient_id: query.patient_id,
        doctor_id: query.doctor_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    match user.role {
        Role::Patient => {
            let Some(patient_id) = service.find_patient_id_for_user(user.id).await? else {
                return Ok(None);
            };
            Ok(Some(RecordFilters {
                patient_id: Some(patient_id),
                ..filters
            }))
        }
        Role::Doctor => {
            let Some(doctor_id) = service.find_doctor_id_for_user(user.id).await? else {
                return Ok(None);
            };
            Ok(Some(RecordFilters {
                doctor_id: Some(doctor_id),
                ..filters
            }))
        }
        Role::Admin => Ok(Some(filters)),
    }
}

#[axum::debug_handler]
pub async fn list_medical_records(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RecordListQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let service = MedicalRecordService::new(&config);

    let Some(filters) = scoped_filters(&service, &user, query)
        .await
        .map_err(map_record_error)?
    else {
        return Ok(Json(vec![]));
    };

    let records = service
        .list_records(filters)
        .await
        .map_err(map_record_error)?;

    Ok(Json(records.iter().map(|r| r.to_response()).collect()))
}

#[axum::debug_handler]
pub async fn create_medical_record(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    // Only clinicians write charts
    if user.role == Role::Patient {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let service = MedicalRecordService::new(&config);

    let record = service
        .create_record(request)
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "message": "Medical record created successfully",
        "recordId": record.id
    })))
}

#[axum::debug_handler]
pub async fn update_medical_record(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    if user.role == Role::Patient {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let updates = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".to_string()))?;

    let service = MedicalRecordService::new(&config);

    // Surface a missing row as 404 before patching
    service.get_record(record_id).await.map_err(map_record_error)?;

    service
        .update_record(record_id, updates)
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "message": "Medical record updated successfully"
    })))
}
