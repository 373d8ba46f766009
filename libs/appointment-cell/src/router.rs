// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, AuthConfigProvider};

use crate::handlers;
use crate::services::AppointmentService;

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppointmentService>,
}

impl AuthConfigProvider for AppointmentState {
    fn jwt_secret(&self) -> &str {
        &self.config.supabase_jwt_secret
    }
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/upcoming", get(handlers::get_upcoming_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::reschedule_appointment)
                .delete(handlers::cancel_appointment),
        )
        .route("/{appointment_id}/confirm", patch(handlers::confirm_appointment))
        .route("/{appointment_id}/complete", patch(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<AppointmentState>))
        .with_state(state)
}

/// Mounted next to the practitioner routes, under `/practitioners`.
pub fn availability_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/{practitioner_id}/availability", get(handlers::get_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<AppointmentState>))
        .with_state(state)
}
