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

use crate::models::{
    AppointmentError, AppointmentFilters, AppointmentStatus, BookAppointmentRequest,
};
use crate::services::BookingService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
}

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound(err.to_string()),
        AppointmentError::SlotTaken | AppointmentError::ParticipantNotFound => {
            AppError::BadRequest(err.to_string())
        }
        AppointmentError::Validation(msg) => AppError::BadRequest(msg),
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

/// Build the effective filters for a caller: patients and doctors are pinned
/// to their own profile row regardless of what they asked for; admins get
/// the filters as supplied. `None` means the caller has no profile row and
/// sees nothing.
async fn scoped_filters(
    service: &BookingService,
    user: &AuthUser,
    query: AppointmentListQuery,
) -> Result<Option<AppointmentFilters>, AppointmentError> {
    // Unparseable status strings are dropped, matching update semantics
    let status = query.status.as_deref().and_then(AppointmentStatus::from_input);

    let filters = AppointmentFilters {
        date: query.date,
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        status,
    };

    match user.role {
        Role::Patient => {
            let Some(patient_id) = service.find_patient_id_for_user(user.id).await? else {
                return Ok(None);
            };
            Ok(Some(AppointmentFilters {
                patient_id: Some(patient_id),
                ..filters
            }))
        }
        Role::Doctor => {
            let Some(doctor_id) = service.find_doctor_id_for_user(user.id).await? else {
                return Ok(None);
            };
            Ok(Some(AppointmentFilters {
                doctor_id: Some(doctor_id),
                ..filters
            }))
        }
        Role::Admin => Ok(Some(filters)),
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let service = BookingService::new(&config);

    let Some(filters) = scoped_filters(&service, &user, query)
        .await
        .map_err(map_appointment_error)?
    else {
        return Ok(Json(vec![]));
    };

    let appointments = service
        .list_appointments(filters)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointments.iter().map(|a| a.to_response()).collect()))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&config);

    let appointment = service
        .create_appointment(request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment created successfully",
        "appointmentId": appointment.id
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let updates = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".to_string()))?;

    let service = BookingService::new(&config);

    service
        .update_appointment(appointment_id, updates)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.role == Role::Patient {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let service = BookingService::new(&config);

    service
        .delete_appointment(appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}
