use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::ServiceRequestStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, PaginationParams,
};
use crate::handlers::AppState;
use crate::services::invoices::{CreateInvoiceRequest, InvoiceItemInput};
use crate::services::service_items::CreateServiceItemRequest;
use crate::services::service_requests::{
    AssignMechanicRequest, CreateServiceRequestRequest, UpdateRequestStatusRequest,
};

#[derive(Debug, Deserialize)]
pub struct ServiceRequestFilters {
    pub status: Option<String>,
    pub vehicle_id: Option<Uuid>,
}

/// Billing fields and line items for an invoice raised against the request in
/// the path.
#[derive(Debug, Deserialize)]
pub struct RequestInvoiceBody {
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_zip: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItemInput>,
}

pub async fn create_service_request(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateServiceRequestRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let service_request = state
        .services
        .service_requests
        .create_request(request)
        .await?;
    Ok(created_response(service_request))
}

pub async fn list_service_requests(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<ServiceRequestFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = filters
        .status
        .map(|s| {
            s.parse::<ServiceRequestStatus>().map_err(|_| {
                ServiceError::InvalidStatus(format!("Unknown service request status: {}", s))
            })
        })
        .transpose()?;

    let service_requests = state
        .services
        .service_requests
        .list_requests(status, filters.vehicle_id, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(service_requests))
}

pub async fn list_service_requests_by_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let service_requests = state
        .services
        .service_requests
        .list_requests_by_user(user_id)
        .await?;
    Ok(success_response(service_requests))
}

pub async fn get_service_request(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let service_request = state
        .services
        .service_requests
        .get_request(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;
    Ok(success_response(service_request))
}

pub async fn assign_mechanic(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignMechanicRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let service_request = state
        .services
        .service_requests
        .assign_mechanic(id, request)
        .await?;
    Ok(success_response(service_request))
}

pub async fn update_status(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRequestStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let service_request = state
        .services
        .service_requests
        .update_status(id, request)
        .await?;
    Ok(success_response(service_request))
}

/// Raises an invoice for the request in the path.
pub async fn create_invoice_for_request(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RequestInvoiceBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            service_request_id: id,
            billing_address: body.billing_address,
            billing_city: body.billing_city,
            billing_zip: body.billing_zip,
            items: body.items,
        })
        .await?;
    Ok(created_response(invoice))
}

/// Adds a line item to the invoice already raised for the request in the path.
pub async fn add_item_for_request(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateServiceItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .service_items
        .attach_to_service_request(id, request)
        .await?;
    Ok(created_response(item))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_service_requests).post(create_service_request))
        .route("/user/:user_id", get(list_service_requests_by_user))
        .route("/:id", get(get_service_request))
        .route("/:id/assign-mechanic", post(assign_mechanic))
        .route("/:id/status", put(update_status))
        .route("/:id/invoice", post(create_invoice_for_request))
        .route("/:id/service-items", post(add_item_for_request))
}
