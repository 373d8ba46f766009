// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{require_facility, require_role};

use crate::models::{
    AvailabilityQuery, CreateAppointmentRequest, NewAppointment, RescheduleAppointmentRequest,
    UpcomingQuery,
};
use crate::router::AppointmentState;

const MANAGERS: &[Role] = &[Role::Admin, Role::Staff];
const PARTICIPANTS: &[Role] = &[Role::Admin, Role::Staff, Role::Patient];

fn patient_subject(user: &User) -> Result<Uuid, AppError> {
    user.subject_id()
        .ok_or_else(|| AppError::Auth("Patient token subject is not a valid id".to_string()))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppointmentState>>,
    Path(practitioner_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, PARTICIPANTS)?;
    let facility_id = require_facility(&user)?;

    let slots = state
        .service
        .get_availability(facility_id, practitioner_id, query.date, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!({
        "practitioner_id": practitioner_id,
        "date": query.date,
        "slots": slots,
        "available": slots.iter().filter(|s| s.available).count(),
        "total": slots.len()
    })))
}

// ==============================================================================
// BOOKING AND LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let role = require_role(&user, PARTICIPANTS)?;
    let facility_id = require_facility(&user)?;

    let subject_id = match role {
        Role::Patient => patient_subject(&user)?,
        _ => request
            .subject_id
            .ok_or_else(|| AppError::BadRequest("subject_id is required".to_string()))?,
    };

    let appointment = state
        .service
        .create_appointment(
            facility_id,
            NewAppointment {
                practitioner_id: request.practitioner_id,
                subject_id,
                start_at: request.start_at,
                end_at: request.end_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let appointment = state.service.confirm_appointment(facility_id, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let appointment = state.service.complete_appointment(facility_id, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let role = require_role(&user, PARTICIPANTS)?;
    let facility_id = require_facility(&user)?;

    if role == Role::Patient {
        state
            .service
            .get_appointment_for_subject(patient_subject(&user)?, appointment_id)
            .await?;
    }

    let appointment = state
        .service
        .reschedule_appointment(facility_id, appointment_id, request)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_role(&user, PARTICIPANTS)?;

    let appointment = match role {
        Role::Patient => {
            state
                .service
                .cancel_appointment_for_subject(patient_subject(&user)?, appointment_id)
                .await?
        }
        _ => {
            let facility_id = require_facility(&user)?;
            state.service.cancel_appointment(facility_id, appointment_id).await?
        }
    };

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_role(&user, PARTICIPANTS)?;

    let appointment = match role {
        Role::Patient => {
            state
                .service
                .get_appointment_for_subject(patient_subject(&user)?, appointment_id)
                .await?
        }
        _ => {
            let facility_id = require_facility(&user)?;
            state.service.get_appointment(facility_id, appointment_id).await?
        }
    };

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_role(&user, PARTICIPANTS)?;

    let appointments = match role {
        Role::Patient => state.service.list_for_subject(patient_subject(&user)?).await?,
        _ => state.service.list_for_facility(require_facility(&user)?).await?,
    };

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<UpcomingQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_role(&user, PARTICIPANTS)?;

    let subject_id = match role {
        Role::Patient => patient_subject(&user)?,
        _ => {
            let subject_id = query
                .subject_id
                .ok_or_else(|| AppError::BadRequest("subject_id is required".to_string()))?;
            state
                .service
                .ensure_subject_in(require_facility(&user)?, subject_id)
                .await?;
            subject_id
        }
    };

    let appointments = state.service.upcoming_for_subject(subject_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
