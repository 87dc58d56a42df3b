use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::UserRole;
use crate::errors::ServiceError;
use crate::handlers::common::{no_content_response, success_response, PaginationParams};
use crate::handlers::AppState;
use crate::services::users::UpdateUserRequest;

pub async fn list_users(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let users = state
        .services
        .users
        .list_users(None, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(users))
}

/// Mechanics only, for assignment pickers.
pub async fn list_mechanics(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let users = state
        .services
        .users
        .list_users(Some(UserRole::Mechanic), pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
    Ok(success_response(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.update_user(id, request).await?;
    Ok(success_response(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.users.delete_user(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/mechanics", get(list_mechanics))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}
