mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use serde_json::json;
use uuid::Uuid;
use vehicle_service_api::entities::UserRole;

#[tokio::test]
async fn register_and_fetch_vehicle() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

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
                "vin_number": "4T1BF1FK5LU123456",
                "mileage": 42_000,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let vehicle = read_json(response).await;
    assert_eq!(vehicle["make"], "Toyota");
    assert_eq!(vehicle["license_plate"], "ABC123");
    let vehicle_id = vehicle["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vehicles/{}", vehicle_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json(response).await;
    assert_eq!(fetched["mileage"].as_i64().unwrap(), 42_000);
}

#[tokio::test]
async fn duplicate_license_plate_is_a_conflict() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

    let payload = |plate: &str| {
        json!({
            "user_id": owner_id,
            "make": "Honda",
            "model": "Civic",
            "year": 2019,
            "license_plate": plate,
        })
    };

    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(payload("SAME-1")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(payload("SAME-1")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn out_of_range_year_is_rejected() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

    for bad_year in [1899, 2999] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/vehicles",
                Some(json!({
                    "user_id": owner_id,
                    "make": "Ford",
                    "model": "Model T",
                    "year": bad_year,
                    "license_plate": format!("YR-{}", bad_year),
                })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn blank_vin_and_non_positive_mileage_normalize_to_null() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({
                "user_id": owner_id,
                "make": "Mazda",
                "model": "3",
                "year": 2021,
                "license_plate": "NORM-1",
                "vin_number": "   ",
                "mileage": 0,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let vehicle = read_json(response).await;
    assert!(vehicle["vin_number"].is_null());
    assert!(vehicle["mileage"].is_null());
}

#[tokio::test]
async fn unknown_owner_is_not_found() {
    let app = TestApp::new().await;
    let (_owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "make": "Tesla",
                "model": "3",
                "year": 2023,
                "license_plate": "GHOST-1",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vehicles_can_be_listed_per_owner() {
    let app = TestApp::new().await;
    let (owner_a, token) = app.register_user(UserRole::User, "a@example.com").await;
    let (owner_b, _) = app.register_user(UserRole::User, "b@example.com").await;

    for (owner, plate) in [(owner_a, "A-1"), (owner_a, "A-2"), (owner_b, "B-1")] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/vehicles",
                Some(json!({
                    "user_id": owner,
                    "make": "Kia",
                    "model": "Rio",
                    "year": 2018,
                    "license_plate": plate,
                })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vehicles/user/{}", owner_a),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"].as_u64().unwrap(), 2);
}

#[tokio::test]
async fn update_overwrites_and_delete_removes() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.register_user(UserRole::User, "owner@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({
                "user_id": owner_id,
                "make": "Subaru",
                "model": "Impreza",
                "year": 2015,
                "license_plate": "UPD-1",
            })),
            Some(&token),
        )
        .await;
    let vehicle = read_json(response).await;
    let vehicle_id = vehicle["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/vehicles/{}", vehicle_id),
            Some(json!({
                "make": "Subaru",
                "model": "Outback",
                "year": 2016,
                "license_plate": "UPD-2",
                "mileage": 60_000,
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["model"], "Outback");
    assert_eq!(updated["license_plate"], "UPD-2");
    assert!(!updated["updated_at"].is_null());

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/vehicles/{}", vehicle_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vehicles/{}", vehicle_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
