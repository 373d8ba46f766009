use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{require_facility, require_role};

use crate::models::{
    CreatePractitionerRequest, UpdatePractitionerRequest, UpdateWorkingIntervalRequest,
    WorkingIntervalInput,
};
use crate::router::PractitionerState;

const MANAGERS: &[Role] = &[Role::Admin, Role::Staff];
const READERS: &[Role] = &[Role::Admin, Role::Staff, Role::Patient];

// ==============================================================================
// PRACTITIONER PROFILES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_practitioner(
    State(state): State<Arc<PractitionerState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePractitionerRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let profile = state.calendar.create_practitioner(facility_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!(profile))))
}

#[axum::debug_handler]
pub async fn list_practitioners(
    State(state): State<Arc<PractitionerState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, READERS)?;
    let facility_id = require_facility(&user)?;

    let practitioners = state.calendar.list_practitioners(facility_id).await?;

    Ok(Json(json!({
        "practitioners": practitioners,
        "total": practitioners.len()
    })))
}

#[axum::debug_handler]
pub async fn get_practitioner(
    State(state): State<Arc<PractitionerState>>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, READERS)?;
    let facility_id = require_facility(&user)?;

    let profile = state.calendar.get_practitioner(facility_id, practitioner_id).await?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn update_practitioner(
    State(state): State<Arc<PractitionerState>>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePractitionerRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let profile = state
        .calendar
        .update_practitioner(facility_id, practitioner_id, request)
        .await?;

    Ok(Json(json!(profile)))
}

// ==============================================================================
// WORKING HOURS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_working_interval(
    State(state): State<Arc<PractitionerState>>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<WorkingIntervalInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let interval = state
        .calendar
        .add_working_interval(facility_id, practitioner_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(interval))))
}

#[axum::debug_handler]
pub async fn list_working_intervals(
    State(state): State<Arc<PractitionerState>>,
    Path(practitioner_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, READERS)?;
    let facility_id = require_facility(&user)?;

    let intervals = state
        .calendar
        .list_working_intervals(facility_id, practitioner_id)
        .await?;

    Ok(Json(json!({
        "working_intervals": intervals,
        "total": intervals.len()
    })))
}

#[axum::debug_handler]
pub async fn update_working_interval(
    State(state): State<Arc<PractitionerState>>,
    Path((practitioner_id, interval_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateWorkingIntervalRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    let interval = state
        .calendar
        .update_working_interval(facility_id, practitioner_id, interval_id, request)
        .await?;

    Ok(Json(json!(interval)))
}

#[axum::debug_handler]
pub async fn delete_working_interval(
    State(state): State<Arc<PractitionerState>>,
    Path((practitioner_id, interval_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MANAGERS)?;
    let facility_id = require_facility(&user)?;

    state
        .calendar
        .delete_working_interval(facility_id, practitioner_id, interval_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Working interval deleted"
    })))
}
