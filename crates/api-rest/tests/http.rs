//! HTTP-level tests driving the full router in memory.

use api_rest::{router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use referral_core::{CoreConfig, NewService, RecordId, Registration, RunMode, Service, Storage};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-with-at-least-32-bytes";
const PASSWORD: &str = "hunter22";

struct TestApp {
    app: Router,
    internal_medicine: RecordId,
    cardiology: RecordId,
}

fn service(name: &str, email: &str, kind: &str) -> Service {
    let input: NewService = serde_json::from_value(json!({
        "name": name,
        "description": "Hospital unit",
        "headOfService": {"name": "Dr. Head", "email": email, "phone": "555-0100"},
        "type": kind
    }))
    .expect("valid service payload");
    Service::create(input, Utc::now())
}

fn setup(mode: RunMode) -> TestApp {
    let storage = Storage::in_memory();
    let internal_medicine = storage
        .services
        .create(service("Medicina Interna", "mi@hospital.org", "MEDICINA_INTERNA"))
        .unwrap()
        .id;
    let cardiology = storage
        .services
        .create(service("Cardiología", "cardio@hospital.org", "CARDIOLOGIA"))
        .unwrap()
        .id;

    let cfg = CoreConfig::new(
        PathBuf::from("unused"),
        SECRET.into(),
        Duration::from_secs(3600),
        mode,
    )
    .unwrap();
    let state = AppState::new(&cfg, storage).unwrap();

    for (name, email, role, service_id) in [
        ("Dr. Medico", "medico@hospital.org", "MEDICO", internal_medicine),
        ("Dr. Jefe", "jefe@hospital.org", "JEFE_SERVICIO", cardiology),
        ("Admin", "admin@hospital.org", "ADMIN", internal_medicine),
    ] {
        let registration: Registration = serde_json::from_value(json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
            "serviceId": service_id,
            "role": role
        }))
        .unwrap();
        state.accounts.provision(registration).unwrap();
    }

    TestApp {
        app: router(state),
        internal_medicine,
        cardiology,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn referral_body(&self, mrn: &str) -> Value {
        json!({
            "patient": {"name": "Ana Torres", "age": 64, "medicalRecordNumber": mrn},
            "requestingServiceId": self.internal_medicine,
            "destinationServiceId": self.cardiology,
            "objective": "Evaluate atrial fibrillation",
            "clinicalHistory": "Pneumonia, irregular pulse on day 2",
            "clinicalStatus": {"subjective": "Palpitations", "vitalSigns": {"heartRate": "128"}},
            "labs": {"resultsDate": "2026-10-01", "results": "TSH normal"},
            "imaging": {"type": "Chest X-ray", "description": "PA", "findings": "RLL consolidation"},
            "personalHistory": "Hypertension",
            "familyHistory": "None relevant",
            "priority": "HIGH"
        })
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = setup(RunMode::Production);
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn referral_lifecycle_over_http() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;
    let jefe = app.login("jefe@hospital.org").await;

    let (status, body) = app
        .send(
            "POST",
            "/referrals",
            Some(&medico),
            Some(app.referral_body("HC-1000")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["allergies"], "None known");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/referrals/{id}/status");

    let (status, body) = app
        .send("PUT", &status_uri, Some(&jefe), Some(json!({"status": "IN_PROGRESS"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "IN_PROGRESS");

    let (status, body) = app
        .send("PUT", &status_uri, Some(&jefe), Some(json!({"status": "PENDING"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "INVALID_TRANSITION");

    let (status, _) = app
        .send("PUT", &status_uri, Some(&jefe), Some(json!({"status": "COMPLETED"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("PUT", &status_uri, Some(&medico), Some(json!({"status": "IN_PROGRESS"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_TRANSITION");

    let (_, body) = app
        .send("GET", &format!("/referrals/{id}"), Some(&medico), None)
        .await;
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["statusHistory"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stale_expected_version_is_conflict() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;
    let (_, body) = app
        .send("POST", "/referrals", Some(&medico), Some(app.referral_body("HC-1100")))
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "PUT",
            &format!("/referrals/{id}/status"),
            Some(&medico),
            Some(json!({"status": "IN_PROGRESS", "expectedVersion": 7})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthenticated() {
    let app = setup(RunMode::Production);
    let (status, body) = app.send("GET", "/referrals/filter", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, _) = app
        .send("GET", "/referrals/filter", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_scope_is_forbidden_without_data() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;

    let (status, body) = app
        .send(
            "GET",
            &format!("/referrals/received/{}", app.cardiology),
            Some(&medico),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
    assert!(body.get("data").is_none());

    let (status, body) = app
        .send(
            "GET",
            &format!("/referrals/filter?direction=sent&serviceId={}", app.cardiology),
            Some(&medico),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("data").is_none());

    let (status, _) = app
        .send("GET", "/referrals/admin/all", Some(&medico), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn filter_partitions_sent_and_received_newest_first() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;
    let admin = app.login("admin@hospital.org").await;

    for mrn in ["HC-1", "HC-2", "HC-3"] {
        let (status, _) = app
            .send("POST", "/referrals", Some(&medico), Some(app.referral_body(mrn)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send("GET", "/referrals/filter?direction=enviadas", Some(&medico), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let sent = body["data"].as_array().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["patient"]["medicalRecordNumber"], "HC-3");

    let (_, body) = app
        .send("GET", "/referrals/filter?direction=received", Some(&medico), None)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app
        .send(
            "GET",
            "/referrals/filter?status=&priority=&direction=sent",
            Some(&medico),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = app
        .send(
            "GET",
            &format!("/referrals/admin/all?serviceId={}", app.cardiology),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = app
        .send("GET", "/referrals/search/history/HC-2", Some(&medico), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_medical_record_number_is_validation_error() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;

    let (status, _) = app
        .send("POST", "/referrals", Some(&medico), Some(app.referral_body("HC-9")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .send("POST", "/referrals", Some(&medico), Some(app.referral_body("HC-9")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_input_uses_the_error_envelope() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;

    let (status, body) = app
        .send("GET", "/referrals/not-an-id", Some(&medico), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let mut payload = app.referral_body("HC-5");
    payload["objective"] = json!("   ");
    let (status, body) = app
        .send("POST", "/referrals", Some(&medico), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body.get("details").is_none());

    let (status, body) = app
        .send("GET", "/referrals/filter?status=ARCHIVED", Some(&medico), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_routes_and_methods_use_the_error_envelope() {
    let app = setup(RunMode::Production);

    let (status, body) = app.send("GET", "/no/such/route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
    assert!(body["message"].as_str().unwrap().contains("/no/such/route"));

    let medico = app.login("medico@hospital.org").await;
    let (status, body) = app
        .send("DELETE", "/referrals/filter", Some(&medico), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn development_mode_exposes_details() {
    let app = setup(RunMode::Development);
    let medico = app.login("medico@hospital.org").await;
    let (status, body) = app
        .send(
            "GET",
            &format!("/referrals/{}", RecordId::new()),
            Some(&medico),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert!(body["details"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn notes_and_notifications() {
    let app = setup(RunMode::Production);
    let medico = app.login("medico@hospital.org").await;
    let jefe = app.login("jefe@hospital.org").await;
    let (_, body) = app
        .send("POST", "/referrals", Some(&medico), Some(app.referral_body("HC-77")))
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "POST",
            &format!("/referrals/{id}/notes"),
            Some(&jefe),
            Some(json!({"content": "Will see the patient today"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"][0]["authorName"], "Dr. Jefe");
    assert_eq!(
        body["data"]["notifications"][0]["message"],
        "New note added by Dr. Jefe"
    );
    assert_eq!(body["data"]["notifications"][0]["read"], false);

    let uri = format!("/referrals/{id}/notifications/read");
    let (status, first) = app.send("PUT", &uri, Some(&medico), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.send("PUT", &uri, Some(&medico), None).await;
    assert_eq!(first["data"], second["data"]);
    assert_eq!(second["data"]["notifications"][0]["read"], true);
}

#[tokio::test]
async fn service_directory_reads_are_public_and_writes_need_admin() {
    let app = setup(RunMode::Production);
    let (status, body) = app.send("GET", "/services", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Cardiología");

    let (_, body) = app.send("GET", "/services/search/interna", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let new_service = json!({
        "name": "Pediatría",
        "description": "Children",
        "headOfService": {"name": "Dr. P", "email": "ped@hospital.org", "phone": "555-0101"},
        "type": "PEDIATRIA"
    });
    let medico = app.login("medico@hospital.org").await;
    let (status, _) = app
        .send("POST", "/services", Some(&medico), Some(new_service.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.login("admin@hospital.org").await;
    let (status, body) = app
        .send("POST", "/services", Some(&admin), Some(new_service))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send("DELETE", &format!("/services/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service deleted");
}

#[tokio::test]
async fn account_management_flow() {
    let app = setup(RunMode::Production);

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "name": "Dr. Nueva",
                "email": "nueva@hospital.org",
                "password": "abcdef",
                "serviceId": app.cardiology,
                "role": "ADMIN"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "name": "Dr. Nueva",
                "email": "nueva@hospital.org",
                "password": "abcdef",
                "serviceId": app.cardiology
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "MEDICO");
    assert!(body["data"].get("passwordHash").is_none());
    let new_id = body["data"]["id"].as_str().unwrap().to_string();

    let admin = app.login("admin@hospital.org").await;
    let (status, _) = app
        .send(
            "PATCH",
            &format!("/auth/users/{new_id}/deactivate"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "nueva@hospital.org", "password": "abcdef"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, body) = app.send("GET", "/auth/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup(RunMode::Production);
    let (status, body) = app.send("GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/referrals/{id}/status"].is_object());
}
