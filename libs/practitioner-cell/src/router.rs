use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, AuthConfigProvider};

use crate::handlers;
use crate::services::calendar::CalendarService;

pub struct PractitionerState {
    pub config: Arc<AppConfig>,
    pub calendar: Arc<CalendarService>,
}

impl AuthConfigProvider for PractitionerState {
    fn jwt_secret(&self) -> &str {
        &self.config.supabase_jwt_secret
    }
}

pub fn practitioner_routes(state: Arc<PractitionerState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_practitioners).post(handlers::create_practitioner))
        .route(
            "/{practitioner_id}",
            get(handlers::get_practitioner).patch(handlers::update_practitioner),
        )
        .route(
            "/{practitioner_id}/working-hours",
            get(handlers::list_working_intervals).post(handlers::add_working_interval),
        )
        .route(
            "/{practitioner_id}/working-hours/{interval_id}",
            patch(handlers::update_working_interval).delete(handlers::delete_working_interval),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<PractitionerState>))
        .with_state(state)
}
