use crate::{
    auth::{hash_password, verify_password, AuthService},
    db::DbPool,
    entities::user::{self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel},
    entities::UserRole,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Option<UserRole>,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for account registration, login, and profile maintenance.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, auth: Arc<AuthService>) -> Self {
        Self {
            db_pool,
            event_sender,
            auth,
        }
    }

    /// Registers a new account. Email addresses are unique across all roles.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check email uniqueness");
                ServiceError::DatabaseError(e)
            })?;

        if existing.is_some() {
            warn!(email = %request.email, "Registration rejected, email already in use");
            return Err(ServiceError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let model = UserActiveModel {
            id: Set(user_id),
            name: Set(request.name),
            email: Set(request.email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role.unwrap_or(UserRole::User)),
            phone: Set(request.phone),
            address: Set(request.address),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let user_model = model.insert(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to create user");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User registered");
        self.event_sender.send(Event::UserRegistered(user_id)).await;

        Ok(model_to_response(user_model))
    }

    /// Verifies credentials and issues a signed access token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let user_model = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up user for login");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::AuthError("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &user_model.password_hash)? {
            warn!(user_id = %user_model.id, "Login rejected, bad password");
            return Err(ServiceError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.auth.generate_token(user_model.id, user_model.role)?;
        info!(user_id = %user_model.id, "User logged in");

        Ok(LoginResponse {
            token,
            user: model_to_response(user_model),
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserResponse>, ServiceError> {
        let db = &*self.db_pool;

        let user_model = UserEntity::find_by_id(user_id).one(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to fetch user");
            ServiceError::DatabaseError(e)
        })?;

        Ok(user_model.map(model_to_response))
    }

    /// Lists users, optionally filtered to a single role. Mechanics are the
    /// common filter when building assignment pickers.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        page: u64,
        per_page: u64,
    ) -> Result<UserListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = UserEntity::find().order_by_asc(user::Column::Name);
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count users");
            ServiceError::DatabaseError(e)
        })?;

        let users = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch users page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(UserListResponse {
            users: users.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Updates profile fields. Email, role, and password are not editable here.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let user_model = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to fetch user for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let mut active: UserActiveModel = user_model.into();
        active.name = Set(request.name);
        active.phone = Set(request.phone);
        active.address = Set(request.address);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to update user");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User updated");
        self.event_sender.send(Event::UserUpdated(user_id)).await;

        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let user_model = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to fetch user for deletion");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        user_model.delete(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to delete user");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User deleted");
        self.event_sender.send(Event::UserDeleted(user_id)).await;

        Ok(())
    }
}

fn model_to_response(model: UserModel) -> UserResponse {
    UserResponse {
        id: model.id,
        name: model.name,
        email: model.email,
        role: model.role,
        phone: model.phone,
        address: model.address,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
