use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, no_content_response, success_response, PaginationParams,
};
use crate::handlers::AppState;
use crate::services::vehicles::{CreateVehicleRequest, UpdateVehicleRequest};

pub async fn create_vehicle(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let vehicle = state.services.vehicles.create_vehicle(request).await?;
    Ok(created_response(vehicle))
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let vehicles = state
        .services
        .vehicles
        .list_vehicles(None, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(vehicles))
}

pub async fn list_vehicles_by_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let vehicles = state
        .services
        .vehicles
        .list_vehicles(Some(user_id), pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(vehicles))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let vehicle = state
        .services
        .vehicles
        .get_vehicle(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Vehicle not found".to_string()))?;
    Ok(success_response(vehicle))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let vehicle = state.services.vehicles.update_vehicle(id, request).await?;
    Ok(success_response(vehicle))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.vehicles.delete_vehicle(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/user/:user_id", get(list_vehicles_by_user))
        .route(
            "/:id",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
}
