mod common;

use axum::http::{Method, StatusCode};
use common::{money, read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use vehicle_service_api::entities::UserRole;

async fn seed_request(app: &TestApp) -> (String, Uuid) {
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;
    let vehicle_id = app.seed_vehicle(&token, owner_id, "INV-1").await;
    let request_id = app.seed_service_request(&token, vehicle_id).await;
    (token, request_id)
}

#[tokio::test]
async fn invoice_total_is_the_sum_of_line_items() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": request_id,
                "billing_address": "1 Main St",
                "billing_city": "Springfield",
                "billing_zip": "01101",
                "items": [
                    {
                        "name": "Oil change",
                        "price": "45.00",
                        "quantity": 1,
                        "item_type": "SERVICE",
                    },
                    {
                        "name": "Synthetic oil 5W-30",
                        "price": "19.99",
                        "quantity": 3,
                        "item_type": "PART",
                        "part_number": "OIL-5W30",
                    },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let invoice = read_json(response).await;
    assert_eq!(invoice["status"], "PENDING");
    // 45.00 + 3 x 19.99
    assert_eq!(money(&invoice["total_amount"]), dec!(104.97));
    assert_eq!(invoice["items"].as_array().unwrap().len(), 2);
    assert_eq!(money(&invoice["items"][1]["subtotal"]), dec!(59.97));
    assert!(invoice["paid_at"].is_null());
}

#[tokio::test]
async fn caller_supplied_totals_are_ignored() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    // total_amount in the payload is not part of the contract and must not
    // influence the computed total.
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": request_id,
                "total_amount": "9999.99",
                "items": [
                    { "name": "Inspection", "price": "30.00", "quantity": 1, "item_type": "LABOR" },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice = read_json(response).await;
    assert_eq!(money(&invoice["total_amount"]), dec!(30.00));
}

#[tokio::test]
async fn invoice_for_unknown_request_persists_nothing() {
    let app = TestApp::new().await;
    let (token, _request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": Uuid::new_v4(),
                "items": [
                    { "name": "Ghost work", "price": "100.00", "quantity": 1, "item_type": "SERVICE" },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/v1/invoices", None, Some(&token))
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"].as_u64().unwrap(), 0);

    let response = app
        .request(Method::GET, "/api/v1/service-items", None, Some(&token))
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn update_replaces_items_and_recomputes_the_total() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": request_id,
                "items": [
                    { "name": "Tire rotation", "price": "25.00", "quantity": 1, "item_type": "SERVICE" },
                    { "name": "Wiper blades", "price": "12.50", "quantity": 2, "item_type": "PART" },
                ],
            })),
            Some(&token),
        )
        .await;
    let invoice = read_json(response).await;
    assert_eq!(money(&invoice["total_amount"]), dec!(50.00));
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/invoices/{}", invoice_id),
            Some(json!({
                "status": "PENDING",
                "billing_address": "2 Elm St",
                "items": [
                    { "name": "Brake pads", "price": "80.00", "quantity": 2, "item_type": "PART" },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = read_json(response).await;
    assert_eq!(money(&updated["total_amount"]), dec!(160.00));
    assert_eq!(updated["billing_address"], "2 Elm St");
    // The old billing city was overwritten with absent, not preserved.
    assert!(updated["billing_city"].is_null());
    let items = updated["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Brake pads");
}

#[tokio::test]
async fn payment_completes_the_invoice_and_restamps_on_repeat() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": request_id,
                "items": [
                    { "name": "Diagnostics", "price": "75.00", "quantity": 1, "item_type": "LABOR" },
                ],
            })),
            Some(&token),
        )
        .await;
    let invoice = read_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let pay = json!({ "payment_method": "CARD", "card_last_four": "1234" });
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/process-payment", invoice_id),
            Some(pay.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid = read_json(response).await;
    assert_eq!(paid["status"], "COMPLETED");
    assert_eq!(paid["payment_method"], "CARD");
    assert_eq!(paid["card_last_four"], "1234");
    let first_paid_at = paid["paid_at"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    // Paying again succeeds and moves the timestamp.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/process-payment", invoice_id),
            Some(pay),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let repaid = read_json(response).await;
    assert_eq!(repaid["status"], "COMPLETED");
    assert_ne!(repaid["paid_at"].as_str().unwrap(), first_paid_at);
}

#[tokio::test]
async fn invoices_are_found_through_their_service_request() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/service-requests/{}/invoice", request_id),
            Some(json!({
                "items": [
                    { "name": "Labor", "price": "60.00", "quantity": 1, "item_type": "LABOR" },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/service-request/{}", request_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let invoices = read_json(response).await;
    assert_eq!(invoices.as_array().unwrap().len(), 1);
    assert_eq!(money(&invoices[0]["total_amount"]), dec!(60.00));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/service-request/{}", Uuid::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_prices_and_zero_quantities_are_rejected() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    for item in [
        json!({ "name": "Refund", "price": "-5.00", "quantity": 1, "item_type": "SERVICE" }),
        json!({ "name": "Nothing", "price": "5.00", "quantity": 0, "item_type": "SERVICE" }),
    ] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/invoices",
                Some(json!({
                    "service_request_id": request_id,
                    "items": [item],
                })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn update_overwrites_status_and_payment_fields_wholesale() {
    let app = TestApp::new().await;
    let (token, request_id) = seed_request(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "service_request_id": request_id,
                "items": [
                    { "name": "Coolant flush", "price": "90.00", "quantity": 1, "item_type": "SERVICE" },
                ],
            })),
            Some(&token),
        )
        .await;
    let invoice = read_json(response).await;
    assert_eq!(invoice["status"], "PENDING");
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/invoices/{}", invoice_id),
            Some(json!({
                "status": "COMPLETED",
                "payment_method": "CASH",
                "items": [
                    { "name": "Coolant flush", "price": "90.00", "quantity": 1, "item_type": "SERVICE" },
                ],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["status"], "COMPLETED");
    assert_eq!(updated["payment_method"], "CASH");
    assert!(updated["card_last_four"].is_null());

    // And back again: the supplied values win every time.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/invoices/{}", invoice_id),
            Some(json!({
                "status": "PENDING",
                "items": [
                    { "name": "Coolant flush", "price": "90.00", "quantity": 1, "item_type": "SERVICE" },
                ],
            })),
            Some(&token),
        )
        .await;
    let reverted = read_json(response).await;
    assert_eq!(reverted["status"], "PENDING");
    assert!(reverted["payment_method"].is_null());
}
