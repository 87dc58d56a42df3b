use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use vehicle_service_api::{
    app_router,
    config::AppConfig,
    db,
    entities::UserRole,
    events::{self, EventSender},
    AppState,
};

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database. Each instance gets its own fresh schema.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, event_sender);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Registers a user with the given role and returns `(user_id, token)`.
    pub async fn register_user(&self, role: UserRole, email: &str) -> (Uuid, String) {
        let role_name = role.to_string();
        let response = self
            .request(
                Method::POST,
                "/auth/register",
                Some(json!({
                    "name": format!("{} {}", role_name, email),
                    "email": email,
                    "password": "password-for-tests",
                    "role": role_name,
                    "phone": "555-0100",
                    "address": "1 Workshop Way",
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "register failed");
        let user: Value = read_json(response).await;
        let user_id = Uuid::parse_str(user["id"].as_str().expect("user id")).expect("uuid");

        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({
                    "email": email,
                    "password": "password-for-tests",
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");
        let login: Value = read_json(response).await;
        let token = login["token"].as_str().expect("token").to_string();

        (user_id, token)
    }

    /// Registers a default customer and returns their token.
    pub async fn customer_token(&self) -> String {
        self.register_user(UserRole::User, "customer@example.com")
            .await
            .1
    }

    /// Registers a vehicle for the given owner and returns its id.
    pub async fn seed_vehicle(&self, token: &str, owner_id: Uuid, plate: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/vehicles",
                Some(json!({
                    "user_id": owner_id,
                    "make": "Toyota",
                    "model": "Camry",
                    "year": 2020,
                    "license_plate": plate,
                })),
                Some(token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "seed vehicle failed");
        let vehicle = read_json(response).await;
        Uuid::parse_str(vehicle["id"].as_str().expect("vehicle id")).expect("uuid")
    }

    /// Opens a service request against a vehicle and returns its id.
    pub async fn seed_service_request(&self, token: &str, vehicle_id: Uuid) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/service-requests",
                Some(json!({
                    "vehicle_id": vehicle_id,
                    "description": "Engine makes a ticking noise at idle",
                    "service_type": "OIL_CHANGE",
                    "priority": "HIGH",
                })),
                Some(token),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "seed service request failed"
        );
        let request = read_json(response).await;
        Uuid::parse_str(request["id"].as_str().expect("request id")).expect("uuid")
    }
}

/// Reads a response body as JSON.
pub async fn read_json(response: Response) -> Value {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}

/// Money fields serialize as JSON strings; parsing makes the comparison
/// independent of how many trailing zeros survived the database round trip.
pub fn money(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .expect("money field was not a string")
        .parse()
        .expect("money field was not a decimal")
}
