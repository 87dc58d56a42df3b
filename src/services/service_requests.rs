use crate::{
    db::DbPool,
    entities::service_request::{
        self, ActiveModel as ServiceRequestActiveModel, Entity as ServiceRequestEntity,
        Model as ServiceRequestModel,
    },
    entities::user::Entity as UserEntity,
    entities::vehicle::{self, Entity as VehicleEntity},
    entities::{ServicePriority, ServiceRequestStatus, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequestRequest {
    pub vehicle_id: Uuid,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Service type is required"))]
    pub service_type: String,
    pub priority: Option<ServicePriority>,
    pub preferred_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignMechanicRequest {
    pub mechanic_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceRequestResponse {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub description: String,
    pub service_type: String,
    pub priority: ServicePriority,
    pub preferred_date: Option<DateTime<Utc>>,
    pub status: ServiceRequestStatus,
    pub mechanic_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ServiceRequestListResponse {
    pub service_requests: Vec<ServiceRequestResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for the service-request workflow: intake, mechanic assignment, and
/// status progression.
#[derive(Clone)]
pub struct ServiceRequestService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ServiceRequestService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Opens a new request against a registered vehicle. Requests always start
    /// out Pending with no mechanic.
    #[instrument(skip(self, request), fields(vehicle_id = %request.vehicle_id))]
    pub async fn create_request(
        &self,
        request: CreateServiceRequestRequest,
    ) -> Result<ServiceRequestResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        VehicleEntity::find_by_id(request.vehicle_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, vehicle_id = %request.vehicle_id, "Failed to resolve vehicle");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Vehicle not found".to_string()))?;

        let request_id = Uuid::new_v4();
        let now = Utc::now();

        let model = ServiceRequestActiveModel {
            id: Set(request_id),
            vehicle_id: Set(request.vehicle_id),
            mechanic_id: Set(None),
            description: Set(request.description),
            service_type: Set(request.service_type),
            priority: Set(request.priority.unwrap_or(ServicePriority::Medium)),
            preferred_date: Set(request.preferred_date),
            status: Set(ServiceRequestStatus::Pending),
            mechanic_notes: Set(None),
            created_at: Set(now),
            assigned_at: Set(None),
        };

        let request_model = model.insert(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to create service request");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_id = %request_id, "Service request created");
        self.event_sender
            .send(Event::ServiceRequestCreated(request_id))
            .await;

        Ok(model_to_response(request_model))
    }

    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<ServiceRequestResponse>, ServiceError> {
        let db = &*self.db_pool;

        let request_model = ServiceRequestEntity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to fetch service request");
                ServiceError::DatabaseError(e)
            })?;

        Ok(request_model.map(model_to_response))
    }

    /// Lists requests with optional status and vehicle filters.
    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        status: Option<ServiceRequestStatus>,
        vehicle_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<ServiceRequestListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query =
            ServiceRequestEntity::find().order_by_desc(service_request::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(service_request::Column::Status.eq(status));
        }
        if let Some(vehicle_id) = vehicle_id {
            query = query.filter(service_request::Column::VehicleId.eq(vehicle_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count service requests");
            ServiceError::DatabaseError(e)
        })?;

        let requests = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch service requests page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(ServiceRequestListResponse {
            service_requests: requests.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Requests whose vehicle belongs to the given user, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_requests_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ServiceRequestResponse>, ServiceError> {
        let db = &*self.db_pool;

        let requests = ServiceRequestEntity::find()
            .join(JoinType::InnerJoin, service_request::Relation::Vehicle.def())
            .filter(vehicle::Column::UserId.eq(user_id))
            .order_by_desc(service_request::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to fetch user's service requests");
                ServiceError::DatabaseError(e)
            })?;

        Ok(requests.into_iter().map(model_to_response).collect())
    }

    /// Assigns a mechanic and moves the request to Assigned. Only users whose
    /// persisted role is MECHANIC are accepted, whatever the token said.
    #[instrument(skip(self, request), fields(request_id = %request_id, mechanic_id = %request.mechanic_id))]
    pub async fn assign_mechanic(
        &self,
        request_id: Uuid,
        request: AssignMechanicRequest,
    ) -> Result<ServiceRequestResponse, ServiceError> {
        let db = &*self.db_pool;

        let request_model = ServiceRequestEntity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to fetch request for assignment");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;

        let mechanic = UserEntity::find_by_id(request.mechanic_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, mechanic_id = %request.mechanic_id, "Failed to fetch mechanic");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Mechanic not found".to_string()))?;

        if mechanic.role != UserRole::Mechanic {
            warn!(
                user_id = %mechanic.id,
                role = %mechanic.role,
                "Assignment rejected, user is not a mechanic"
            );
            return Err(ServiceError::InvalidRole(format!(
                "User {} is not a mechanic",
                mechanic.id
            )));
        }

        let old_status = request_model.status;
        let mut active: ServiceRequestActiveModel = request_model.into();
        active.mechanic_id = Set(Some(request.mechanic_id));
        active.status = Set(ServiceRequestStatus::Assigned);
        active.assigned_at = Set(Some(Utc::now()));
        if let Some(notes) = request.notes {
            active.mechanic_notes = Set(Some(notes));
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to assign mechanic");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            request_id = %request_id,
            mechanic_id = %request.mechanic_id,
            old_status = %old_status,
            "Mechanic assigned"
        );
        self.event_sender
            .send(Event::MechanicAssigned {
                request_id,
                mechanic_id: request.mechanic_id,
            })
            .await;

        Ok(model_to_response(updated))
    }

    /// Sets the request status. Any member of the status enum is accepted in
    /// any order; there is no transition graph.
    #[instrument(skip(self, request), fields(request_id = %request_id, new_status = %request.status))]
    pub async fn update_status(
        &self,
        request_id: Uuid,
        request: UpdateRequestStatusRequest,
    ) -> Result<ServiceRequestResponse, ServiceError> {
        let new_status: ServiceRequestStatus = request.status.parse().map_err(|_| {
            ServiceError::InvalidStatus(format!("Unknown service request status: {}", request.status))
        })?;

        let db = &*self.db_pool;

        let request_model = ServiceRequestEntity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to fetch request for status update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;

        let old_status = request_model.status;
        let mut active: ServiceRequestActiveModel = request_model.into();
        active.status = Set(new_status);
        if let Some(notes) = request.notes {
            active.mechanic_notes = Set(Some(notes));
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to update request status");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            request_id = %request_id,
            old_status = %old_status,
            new_status = %new_status,
            "Service request status updated"
        );
        self.event_sender
            .send(Event::ServiceRequestStatusChanged {
                request_id,
                old_status,
                new_status,
            })
            .await;

        Ok(model_to_response(updated))
    }

}

fn model_to_response(model: ServiceRequestModel) -> ServiceRequestResponse {
    ServiceRequestResponse {
        id: model.id,
        vehicle_id: model.vehicle_id,
        mechanic_id: model.mechanic_id,
        description: model.description,
        service_type: model.service_type,
        priority: model.priority,
        preferred_date: model.preferred_date,
        status: model.status,
        mechanic_notes: model.mechanic_notes,
        created_at: model.created_at,
        assigned_at: model.assigned_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        let parsed: ServiceRequestStatus = "in_progress".parse().unwrap();
        assert_eq!(parsed, ServiceRequestStatus::InProgress);
        let parsed: ServiceRequestStatus = "COMPLETED".parse().unwrap();
        assert_eq!(parsed, ServiceRequestStatus::Completed);
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert!("ON_FIRE".parse::<ServiceRequestStatus>().is_err());
    }

    #[test]
    fn create_request_requires_description() {
        let request = CreateServiceRequestRequest {
            vehicle_id: Uuid::new_v4(),
            description: String::new(),
            service_type: "OIL_CHANGE".to_string(),
            priority: None,
            preferred_date: None,
        };
        assert!(request.validate().is_err());
    }
}
