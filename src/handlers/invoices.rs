use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::InvoiceStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, no_content_response, success_response, PaginationParams,
};
use crate::handlers::AppState;
use crate::services::invoices::{CreateInvoiceRequest, ProcessPaymentRequest, UpdateInvoiceRequest};

#[derive(Debug, Deserialize)]
pub struct InvoiceFilters {
    pub status: Option<String>,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.create_invoice(request).await?;
    Ok(created_response(invoice))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<InvoiceFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = filters
        .status
        .map(|s| {
            s.parse::<InvoiceStatus>()
                .map_err(|_| ServiceError::InvalidStatus(format!("Unknown invoice status: {}", s)))
        })
        .transpose()?;

    let invoices = state
        .services
        .invoices
        .list_invoices(status, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .invoices
        .get_invoice(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;
    Ok(success_response(invoice))
}

pub async fn get_by_service_request(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(service_request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoices = state
        .services
        .invoices
        .get_by_service_request(service_request_id)
        .await?;
    Ok(success_response(invoices))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.update_invoice(id, request).await?;
    Ok(success_response(invoice))
}

pub async fn process_payment(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.process_payment(id, request).await?;
    Ok(success_response(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.invoices.delete_invoice(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/service-request/:id", get(get_by_service_request))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:id/process-payment", post(process_payment))
}
