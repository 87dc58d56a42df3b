use crate::{
    db::DbPool,
    entities::user::Entity as UserEntity,
    entities::vehicle::{
        self, ActiveModel as VehicleActiveModel, Entity as VehicleEntity, Model as VehicleModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const MIN_MODEL_YEAR: i32 = 1900;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "Make is required"))]
    pub make: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    pub year: i32,
    #[validate(length(min = 1, message = "License plate is required"))]
    pub license_plate: String,
    pub vin_number: Option<String>,
    pub mileage: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, message = "Make is required"))]
    pub make: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    pub year: i32,
    #[validate(length(min = 1, message = "License plate is required"))]
    pub license_plate: String,
    pub vin_number: Option<String>,
    pub mileage: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub vin_number: Option<String>,
    pub mileage: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct VehicleListResponse {
    pub vehicles: Vec<VehicleResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for the customer vehicle registry.
#[derive(Clone)]
pub struct VehicleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl VehicleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers a vehicle. License plates are unique across the shop.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, license_plate = %request.license_plate))]
    pub async fn create_vehicle(
        &self,
        request: CreateVehicleRequest,
    ) -> Result<VehicleResponse, ServiceError> {
        request.validate()?;
        validate_year(request.year)?;

        let db = &*self.db_pool;

        UserEntity::find_by_id(request.user_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %request.user_id, "Failed to resolve vehicle owner");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Owner not found".to_string()))?;

        self.check_plate_available(&request.license_plate, None).await?;

        let vehicle_id = Uuid::new_v4();
        let now = Utc::now();

        let model = VehicleActiveModel {
            id: Set(vehicle_id),
            user_id: Set(request.user_id),
            make: Set(request.make),
            model: Set(request.model),
            year: Set(request.year),
            license_plate: Set(request.license_plate),
            vin_number: Set(normalize_vin(request.vin_number)),
            mileage: Set(normalize_mileage(request.mileage)),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let vehicle_model = model.insert(db).await.map_err(|e| {
            error!(error = %e, vehicle_id = %vehicle_id, "Failed to create vehicle");
            ServiceError::DatabaseError(e)
        })?;

        info!(vehicle_id = %vehicle_id, "Vehicle registered");
        self.event_sender.send(Event::VehicleCreated(vehicle_id)).await;

        Ok(model_to_response(vehicle_model))
    }

    #[instrument(skip(self), fields(vehicle_id = %vehicle_id))]
    pub async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Option<VehicleResponse>, ServiceError> {
        let db = &*self.db_pool;

        let vehicle_model = VehicleEntity::find_by_id(vehicle_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, vehicle_id = %vehicle_id, "Failed to fetch vehicle");
                ServiceError::DatabaseError(e)
            })?;

        Ok(vehicle_model.map(model_to_response))
    }

    /// Lists vehicles, optionally scoped to one owner.
    #[instrument(skip(self))]
    pub async fn list_vehicles(
        &self,
        user_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<VehicleListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = VehicleEntity::find().order_by_desc(vehicle::Column::CreatedAt);
        if let Some(user_id) = user_id {
            query = query.filter(vehicle::Column::UserId.eq(user_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count vehicles");
            ServiceError::DatabaseError(e)
        })?;

        let vehicles = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch vehicles page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(VehicleListResponse {
            vehicles: vehicles.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Replaces the editable fields of a vehicle. The owner never changes.
    #[instrument(skip(self, request), fields(vehicle_id = %vehicle_id))]
    pub async fn update_vehicle(
        &self,
        vehicle_id: Uuid,
        request: UpdateVehicleRequest,
    ) -> Result<VehicleResponse, ServiceError> {
        request.validate()?;
        validate_year(request.year)?;

        let db = &*self.db_pool;

        let vehicle_model = VehicleEntity::find_by_id(vehicle_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, vehicle_id = %vehicle_id, "Failed to fetch vehicle for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Vehicle not found".to_string()))?;

        if vehicle_model.license_plate != request.license_plate {
            self.check_plate_available(&request.license_plate, Some(vehicle_id))
                .await?;
        }

        let mut active: VehicleActiveModel = vehicle_model.into();
        active.make = Set(request.make);
        active.model = Set(request.model);
        active.year = Set(request.year);
        active.license_plate = Set(request.license_plate);
        active.vin_number = Set(normalize_vin(request.vin_number));
        active.mileage = Set(normalize_mileage(request.mileage));
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, vehicle_id = %vehicle_id, "Failed to update vehicle");
            ServiceError::DatabaseError(e)
        })?;

        info!(vehicle_id = %vehicle_id, "Vehicle updated");
        self.event_sender.send(Event::VehicleUpdated(vehicle_id)).await;

        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(vehicle_id = %vehicle_id))]
    pub async fn delete_vehicle(&self, vehicle_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let vehicle_model = VehicleEntity::find_by_id(vehicle_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, vehicle_id = %vehicle_id, "Failed to fetch vehicle for deletion");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Vehicle not found".to_string()))?;

        vehicle_model.delete(db).await.map_err(|e| {
            error!(error = %e, vehicle_id = %vehicle_id, "Failed to delete vehicle");
            ServiceError::DatabaseError(e)
        })?;

        info!(vehicle_id = %vehicle_id, "Vehicle deleted");
        self.event_sender.send(Event::VehicleDeleted(vehicle_id)).await;

        Ok(())
    }

    async fn check_plate_available(
        &self,
        license_plate: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = VehicleEntity::find()
            .filter(vehicle::Column::LicensePlate.eq(license_plate))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check license plate uniqueness");
                ServiceError::DatabaseError(e)
            })?;

        match existing {
            Some(v) if Some(v.id) != exclude => {
                warn!(license_plate = %license_plate, "Duplicate license plate rejected");
                Err(ServiceError::Conflict(
                    "A vehicle with this license plate is already registered".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Model years run from 1900 through next year, which covers early-release
/// models sold ahead of their calendar year.
fn validate_year(year: i32) -> Result<(), ServiceError> {
    let max_year = Utc::now().year() + 1;
    if year < MIN_MODEL_YEAR || year > max_year {
        return Err(ServiceError::InvalidInput(format!(
            "Year must be between {} and {}",
            MIN_MODEL_YEAR, max_year
        )));
    }
    Ok(())
}

/// Blank VINs are stored as absent rather than empty strings.
fn normalize_vin(vin: Option<String>) -> Option<String> {
    vin.filter(|v| !v.trim().is_empty())
}

/// Zero or negative mileage readings are treated as not recorded.
fn normalize_mileage(mileage: Option<i32>) -> Option<i32> {
    mileage.filter(|m| *m > 0)
}

fn model_to_response(model: VehicleModel) -> VehicleResponse {
    VehicleResponse {
        id: model.id,
        user_id: model.user_id,
        make: model.make,
        model: model.model,
        year: model.year,
        license_plate: model.license_plate,
        vin_number: model.vin_number,
        mileage: model.mileage,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_bounds_are_inclusive() {
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(Utc::now().year()).is_ok());
        assert!(validate_year(Utc::now().year() + 1).is_ok());
        assert!(validate_year(Utc::now().year() + 2).is_err());
    }

    #[test]
    fn blank_vin_becomes_none() {
        assert_eq!(normalize_vin(None), None);
        assert_eq!(normalize_vin(Some("".to_string())), None);
        assert_eq!(normalize_vin(Some("   ".to_string())), None);
        assert_eq!(
            normalize_vin(Some("1HGBH41JXMN109186".to_string())),
            Some("1HGBH41JXMN109186".to_string())
        );
    }

    #[test]
    fn non_positive_mileage_becomes_none() {
        assert_eq!(normalize_mileage(Some(0)), None);
        assert_eq!(normalize_mileage(Some(-5)), None);
        assert_eq!(normalize_mileage(Some(42000)), Some(42000));
        assert_eq!(normalize_mileage(None), None);
    }
}
