use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use practitioner_cell::{
    PractitionerRepo, RepositoryError, SupabasePractitionerRepo, SupabaseWorkingIntervalRepo,
    WorkingIntervalRepo,
};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn client(server: &MockServer) -> Arc<SupabaseClient> {
    Arc::new(SupabaseClient::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config()))
}

#[tokio::test]
async fn reads_practitioner_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let facility = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/practitioners"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockSupabaseResponses::practitioner_response(id, facility, 15)])),
        )
        .mount(&server)
        .await;

    let repo = SupabasePractitionerRepo::new(client(&server));
    let practitioner = repo.get(id).await.unwrap().unwrap();

    assert_eq!(practitioner.facility_id, facility);
    assert_eq!(practitioner.slot_duration_minutes, 15);
}

#[tokio::test]
async fn weekday_query_filters_and_parses_time_columns() {
    let server = MockServer::start().await;
    let practitioner = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_intervals"))
        .and(query_param("practitioner_id", format!("eq.{}", practitioner)))
        .and(query_param("day_of_week", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_interval_response(Uuid::new_v4(), practitioner, 1, "14:00:00", "17:00:00"),
            MockSupabaseResponses::working_interval_response(Uuid::new_v4(), practitioner, 1, "09:00:00", "12:00:00"),
        ])))
        .mount(&server)
        .await;

    let repo = SupabaseWorkingIntervalRepo::new(client(&server));
    let rows = repo.for_weekday(practitioner, 1).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].start_local.format("%H:%M").to_string(), "09:00");
}

#[tokio::test]
async fn delete_of_missing_row_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/working_intervals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = SupabaseWorkingIntervalRepo::new(client(&server));
    assert_matches!(repo.delete(Uuid::new_v4()).await, Err(RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn server_errors_surface_as_backend_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/practitioners"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "XX000")),
        )
        .mount(&server)
        .await;

    let repo = SupabasePractitionerRepo::new(client(&server));
    assert_matches!(repo.list_by_facility(Uuid::new_v4()).await, Err(RepositoryError::Backend(_)));
}

#[tokio::test]
async fn practitioner_delete_targets_one_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/practitioners"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockSupabaseResponses::practitioner_response(id, Uuid::new_v4(), 30)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repo = SupabasePractitionerRepo::new(client(&server));
    repo.delete(id).await.unwrap();
}
