//! The wired client core against a real HTTP server.

use medflow::client::{Role, SessionMarkers};
use medflow::{Medflow, MedflowConfig, RecommendationStatus};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> MedflowConfig {
    MedflowConfig::from_toml(&format!(
        r#"
[api]
base_url = "{}/api"
refresh_path = "auth/refresh"
timeout_secs = 5

[cache]
max_entries = 16
"#,
        server.uri()
    ))
    .unwrap()
}

#[tokio::test]
async fn approval_round_trip_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/nurse/recommendations/pending"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "R123", "patient_id": "P1"}])),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/doctor/recommendations/R123/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": "R123", "patient_id": "P1", "status": "approved"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let app = Medflow::builder(config_for(&server)).build().unwrap();
    app.login(SessionMarkers::new(Role::Doctor, "Dr. Ruiz"))
        .unwrap();
    let nurse = app.nurse();

    let before = nurse.pending_recommendations().await.unwrap();
    assert_eq!(before[0].status, RecommendationStatus::Pending);

    let approved = app.doctor().approve_recommendation("R123").await.unwrap();
    assert_eq!(approved.status, RecommendationStatus::Approved);

    nurse.pending_recommendations().await.unwrap();
    nurse.pending_recommendations().await.unwrap();
}

#[tokio::test]
async fn server_error_on_write_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/admin/backups"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "disk full"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = Medflow::builder(config_for(&server)).build().unwrap();
    let err = app.admin().create_backup().await.unwrap_err();

    assert!(err.to_string().contains("disk full"));
    assert!(!err.is_session_terminated());
    assert_eq!(app.bus().stats().events_published, 0);
}
