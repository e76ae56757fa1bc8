//! Router tests
//!
//! Drive the assembled router in-process for the paths that are decided before
//! any query runs:
//! - Bearer token gate
//! - Role checks on booking and slot endpoints
//! - Error envelope shape and codes

use std::sync::Arc;

use agri_warehouse_backend::{
    config::{BookingConfig, DatabaseConfig, JwtConfig, NotificationConfig, QrConfig, ServerConfig},
    create_app,
    middleware::{auth::decode_auth_user, auth::Claims, UserRole},
    AppState, Config,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "router-test-secret";

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/agri_router_test".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        notification: NotificationConfig::default(),
        qr: QrConfig::default(),
        booking: BookingConfig::default(),
    }
}

/// Router over a lazy pool; nothing here reaches the database
fn test_app() -> Router {
    let config = test_config();
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database.url)
        .unwrap();

    create_app(AppState {
        db,
        config: Arc::new(config),
        sms: None,
    })
}

fn token_for(role: UserRole) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        role,
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = test_app().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ============================================================================
// Token gate
// ============================================================================

#[tokio::test]
async fn test_root_is_public() {
    let response = test_app()
        .oneshot(request(Method::GET, "/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Warehouse Slot Booking API v1");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(request(Method::GET, "/api/v1/bookings/mine", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let now = Utc::now().timestamp();
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: Uuid::new_v4().to_string(),
            role: UserRole::Admin,
            exp: now + 3600,
            iat: now,
        },
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let (status, body) = send(request(
        Method::GET,
        "/api/v1/bookings/today",
        Some(&forged),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[test]
fn test_token_decoding() {
    let user = tokio_test::assert_ok!(decode_auth_user(&token_for(UserRole::FieldOfficer), SECRET));
    assert_eq!(user.role, UserRole::FieldOfficer);
    assert!(user.is_staff());
    assert!(!user.is_admin());

    tokio_test::assert_err!(decode_auth_user("not-a-jwt", SECRET));
    tokio_test::assert_err!(decode_auth_user(&token_for(UserRole::Admin), "wrong-secret"));
}

// ============================================================================
// Role checks
// ============================================================================

#[tokio::test]
async fn test_farmer_cannot_approve() {
    let token = token_for(UserRole::Farmer);
    let uri = format!("/api/v1/bookings/{}/approve", Uuid::new_v4());

    let (status, body) = send(request(Method::POST, &uri, Some(&token), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_only_farmers_create_bookings() {
    let token = token_for(UserRole::FieldOfficer);
    let body = serde_json::json!({
        "warehouse_id": Uuid::new_v4(),
        "time_slot_id": Uuid::new_v4(),
        "farmer_name": "Asha Patil",
        "farmer_mobile": "9876543210",
    });

    let (status, body) = send(request(Method::POST, "/api/v1/bookings", Some(&token), Some(body))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_farmer_cannot_confirm_pickup() {
    let token = token_for(UserRole::Farmer);
    let uri = format!("/api/v1/bookings/{}/pickup", Uuid::new_v4());

    let (status, _) = send(request(Method::POST, &uri, Some(&token), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_field_officer_cannot_manage_slots() {
    let token = token_for(UserRole::FieldOfficer);
    let uri = format!("/api/v1/slots/{}", Uuid::new_v4());

    let (status, body) = send(request(Method::DELETE, &uri, Some(&token), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

// ============================================================================
// Validation envelope
// ============================================================================

#[tokio::test]
async fn test_inverted_statistics_range_is_rejected() {
    let token = token_for(UserRole::Admin);

    let (status, body) = send(request(
        Method::GET,
        "/api/v1/slots/statistics?start_date=2024-06-10&end_date=2024-06-01",
        Some(&token),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "end_date");
}

#[tokio::test]
async fn test_inverted_export_range_is_rejected() {
    let token = token_for(UserRole::Admin);

    let (status, body) = send(request(
        Method::GET,
        "/api/v1/bookings/export?start_date=2024-06-10&end_date=2024-06-01",
        Some(&token),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "end_date");
}

#[tokio::test]
async fn test_malformed_query_uses_error_envelope() {
    let token = token_for(UserRole::Farmer);
    let uri = format!("/api/v1/warehouses/{}/slots?date=next-tuesday", Uuid::new_v4());

    let (status, body) = send(request(Method::GET, &uri, Some(&token), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "query");
}

#[tokio::test]
async fn test_malformed_path_uses_error_envelope() {
    let token = token_for(UserRole::Farmer);

    let (status, body) = send(request(
        Method::GET,
        "/api/v1/bookings/not-a-uuid",
        Some(&token),
        None,
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "path");
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let token = token_for(UserRole::Farmer);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/bookings")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"warehouse_id\": "))
        .unwrap();

    let (status, body) = send(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "body");
    assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
}
