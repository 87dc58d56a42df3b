mod common;

use axum::http::{Method, StatusCode};
use common::{money, read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use vehicle_service_api::entities::UserRole;

/// Walks the whole shop workflow: register, bring a car in, open a request,
/// assign a mechanic, finish the work, bill it, and take payment.
#[tokio::test]
async fn full_shop_visit_from_intake_to_payment() {
    let app = TestApp::new().await;

    let (owner_id, owner_token) = app.register_user(UserRole::User, "driver@example.com").await;
    let (mechanic_id, _) = app
        .register_user(UserRole::Mechanic, "mechanic@example.com")
        .await;

    // Intake: the car and the complaint.
    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({
                "user_id": owner_id,
                "make": "Toyota",
                "model": "Camry",
                "year": 2020,
                "license_plate": "ABC123",
            })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let vehicle = read_json(response).await;
    let vehicle_id = vehicle["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/service-requests",
            Some(json!({
                "vehicle_id": vehicle_id,
                "description": "Oil change and general inspection",
                "service_type": "OIL_CHANGE",
                "priority": "MEDIUM",
            })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let request = read_json(response).await;
    assert_eq!(request["status"], "PENDING");
    let request_id = request["id"].as_str().unwrap().to_string();

    // Dispatch.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/service-requests/{}/assign-mechanic", request_id),
            Some(json!({ "mechanic_id": mechanic_id })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ASSIGNED");

    // Work happens.
    for status in ["IN_PROGRESS", "COMPLETED"] {
        let response = app
            .request(
                Method::PUT,
                &format!("/api/v1/service-requests/{}/status", request_id),
                Some(json!({ "status": status })),
                Some(&owner_token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Billing through the request endpoint.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/service-requests/{}/invoice", request_id),
            Some(json!({
                "billing_address": "1 Main St",
                "billing_city": "Springfield",
                "billing_zip": "01101",
                "items": [
                    { "name": "Oil change", "price": "45.00", "quantity": 1, "item_type": "SERVICE" },
                    { "name": "Inspection labor", "price": "60.00", "quantity": 1, "item_type": "LABOR" },
                ],
            })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice = read_json(response).await;
    assert_eq!(money(&invoice["total_amount"]), dec!(105.00));
    assert_eq!(invoice["status"], "PENDING");
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    // Payment.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/process-payment", invoice_id),
            Some(json!({ "payment_method": "CARD", "card_last_four": "1234" })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid = read_json(response).await;
    assert_eq!(paid["status"], "COMPLETED");
    assert!(!paid["paid_at"].is_null());

    // The owner's history shows the completed visit.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/service-requests/user/{}", owner_id),
            None,
            Some(&owner_token),
        )
        .await;
    let history = read_json(response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "COMPLETED");
}

/// Concurrent status writers both succeed; the row ends up with whichever
/// write landed last. There is no version column on requests.
#[tokio::test]
async fn concurrent_status_updates_are_last_write_wins() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;
    let vehicle_id = app.seed_vehicle(&token, owner_id, "RACE-1").await;
    let request_id = app.seed_service_request(&token, vehicle_id).await;

    for status in ["IN_PROGRESS", "CANCELLED"] {
        let response = app
            .request(
                Method::PUT,
                &format!("/api/v1/service-requests/{}/status", request_id),
                Some(json!({ "status": status })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/service-requests/{}", request_id),
            None,
            Some(&token),
        )
        .await;
    let request = read_json(response).await;
    assert_eq!(request["status"], "CANCELLED");
}
