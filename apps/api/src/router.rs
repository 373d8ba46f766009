use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, availability_routes};
use practitioner_cell::practitioner_routes;

use crate::wiring::Services;

pub fn create_router(services: &Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduler API is running!" }))
        .nest(
            "/practitioners",
            practitioner_routes(services.practitioners.clone())
                .merge(availability_routes(services.appointments.clone())),
        )
        .nest("/appointments", appointment_routes(services.appointments.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use shared_config::StorageBackend;
    use shared_utils::test_utils::TestConfig;

    use super::*;
    use crate::wiring;

    async fn services() -> Services {
        let config = TestConfig::default().to_app_config();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        wiring::build(Arc::new(config)).await.unwrap()
    }

    #[tokio::test]
    async fn health_check_responds() {
        let app = create_router(&services().await);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cell_routes_require_a_token() {
        let app = create_router(&services().await);
        for uri in ["/practitioners", "/appointments"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
