use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_record_cell::router::medical_record_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    medical_record_routes(Arc::new(config))
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn doctor_creates_a_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let record_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": patient_id }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": doctor_id }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::medical_record_row(record_id, patient_id, doctor_id)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = TestUser::doctor("dr@clinic.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request(
            "POST",
            "/",
            &token,
            Some(json!({
                "patientId": patient_id,
                "doctorId": doctor_id,
                "visitDate": "2025-03-10",
                "chiefComplaint": "Blurry vision",
                "diagnosis": "Myopia",
                "visualAcuityRight": "20/40",
                "visualAcuityLeft": "20/30"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Medical record created successfully");
    assert_eq!(body["recordId"], json!(record_id));
}

#[tokio::test]
async fn patients_cannot_write_charts() {
    let config = TestConfig::default().to_app_config();

    let user = TestUser::patient("pat@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request(
            "POST",
            "/",
            &token,
            Some(json!({
                "patientId": Uuid::new_v4(),
                "doctorId": Uuid::new_v4(),
                "visitDate": "2025-03-10"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Access denied");
}

#[tokio::test]
async fn record_for_unknown_patient_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::doctor("dr@clinic.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request(
            "POST",
            "/",
            &token,
            Some(json!({
                "patientId": Uuid::new_v4(),
                "doctorId": Uuid::new_v4(),
                "visitDate": "2025-03-10"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Patient or Doctor not found");
}

#[tokio::test]
async fn patient_history_is_pinned_to_their_own_chart() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    let user = TestUser::patient("pat@example.com");
    let own_patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": own_patient_id }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("patient_id", format!("eq.{}", own_patient_id)))
        .and(query_param("order", "visit_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::medical_record_row_with_names(Uuid::new_v4(), own_patient_id, Uuid::new_v4())
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    // A caller-supplied patientId is overridden by their own chart id
    let response = app
        .oneshot(authed_request(
            "GET",
            &format!("/?patientId={}", Uuid::new_v4()),
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["patient_id"], json!(own_patient_id));
    assert_eq!(rows[0]["diagnosis"], "Myopia");
    assert_eq!(rows[0]["doctor_first_name"], "John");
}

#[tokio::test]
async fn admin_filters_history_by_date_range() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("visit_date", "gte.2025-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = TestUser::admin("admin@clinic.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request("GET", "/?startDate=2025-01-01", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn doctor_amends_an_existing_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    let record_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::medical_record_row(record_id, Uuid::new_v4(), Uuid::new_v4())
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::medical_record_row(record_id, Uuid::new_v4(), Uuid::new_v4())
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = TestUser::doctor("dr@clinic.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/{}", record_id),
            &token,
            Some(json!({ "treatmentPlan": "New lenses", "followUpDate": "2025-09-10" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Medical record updated successfully");
}

#[tokio::test]
async fn amending_a_missing_record_is_a_404() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::admin("admin@clinic.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/{}", Uuid::new_v4()),
            &token,
            Some(json!({ "notes": "lost" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Medical record not found");
}
