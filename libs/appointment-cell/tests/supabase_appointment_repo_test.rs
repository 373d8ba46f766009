use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{Appointment, AppointmentRepo, AppointmentStatus, SupabaseAppointmentRepo};
use practitioner_cell::{Interval, RepositoryError};
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

fn repo(server: &MockServer) -> SupabaseAppointmentRepo {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseAppointmentRepo::new(Arc::new(SupabaseClient::new(&config)))
}

fn appointment() -> Appointment {
    let start_at = Utc.with_ymd_and_hms(2025, 10, 13, 1, 0, 0).unwrap();
    Appointment {
        id: Uuid::new_v4(),
        facility_id: Uuid::new_v4(),
        practitioner_id: Uuid::new_v4(),
        subject_id: Uuid::new_v4(),
        start_at,
        end_at: start_at + Duration::minutes(30),
        status: AppointmentStatus::Pending,
        version: 3,
        created_at: start_at,
        updated_at: start_at,
    }
}

fn row(appointment: &Appointment) -> Value {
    serde_json::to_value(appointment).unwrap()
}

#[tokio::test]
async fn window_query_excludes_cancelled_and_self() {
    let server = MockServer::start().await;
    let booked = appointment();
    let excluded = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("practitioner_id", format!("eq.{}", booked.practitioner_id)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("id", format!("neq.{}", excluded)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(&booked)])))
        .expect(1)
        .mount(&server)
        .await;

    let window = Interval::new(booked.start_at - Duration::hours(1), booked.start_at + Duration::hours(23)).unwrap();
    let found = repo(&server)
        .active_starting_in(booked.practitioner_id, window, Some(excluded))
        .await
        .unwrap();

    assert_eq!(found, vec![booked]);
}

#[tokio::test]
async fn update_is_conditional_on_version() {
    let server = MockServer::start().await;
    let stored = appointment();
    let confirmed = Appointment { status: AppointmentStatus::Confirmed, version: 4, ..stored.clone() };

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", stored.id)))
        .and(query_param("version", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(&confirmed)])))
        .mount(&server)
        .await;

    let updated = repo(&server)
        .update(Appointment { status: AppointmentStatus::Confirmed, ..stored }, 3)
        .await
        .unwrap();

    assert_eq!(updated.version, 4);
}

#[tokio::test]
async fn no_matching_version_is_a_conflict() {
    let server = MockServer::start().await;
    let stale = appointment();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(
        repo(&server).update(stale.clone(), 3).await,
        Err(RepositoryError::VersionConflict(id)) if id == stale.id
    );
}

#[tokio::test]
async fn unique_index_violation_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    assert_matches!(
        repo(&server).insert(appointment()).await,
        Err(RepositoryError::UniqueViolation(_))
    );
}
