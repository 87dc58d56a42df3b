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
use crate::services::service_items::{CreateServiceItemRequest, UpdateServiceItemRequest};

pub async fn create_service_item(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateServiceItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.service_items.create_item(request).await?;
    Ok(created_response(item))
}

pub async fn list_service_items(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state
        .services
        .service_items
        .list_items(pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(items))
}

pub async fn list_by_invoice(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state
        .services
        .service_items
        .list_items_by_invoice(invoice_id)
        .await?;
    Ok(success_response(items))
}

pub async fn get_service_item(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .service_items
        .get_item(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Service item not found".to_string()))?;
    Ok(success_response(item))
}

pub async fn update_service_item(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .service_items
        .update_item(id, request)
        .await?;
    Ok(success_response(item))
}

pub async fn delete_service_item(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.service_items.delete_item(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_service_items).post(create_service_item))
        .route("/invoice/:invoice_id", get(list_by_invoice))
        .route(
            "/:id",
            get(get_service_item)
                .put(update_service_item)
                .delete(delete_service_item),
        )
}
