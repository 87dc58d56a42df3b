use crate::{
    db::DbPool,
    entities::invoice::{self, Entity as InvoiceEntity},
    entities::service_item::{
        self, ActiveModel as ServiceItemActiveModel, Entity as ServiceItemEntity,
        Model as ServiceItemModel,
    },
    entities::service_request::Entity as ServiceRequestEntity,
    entities::ServiceItemType,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceItemRequest {
    /// Absent means a detached item, to be linked later.
    pub invoice_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub item_type: ServiceItemType,
    pub part_number: Option<String>,
    pub warranty_info: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceItemRequest {
    pub invoice_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub item_type: ServiceItemType,
    pub part_number: Option<String>,
    pub warranty_info: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceItemResponse {
    pub id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub item_type: ServiceItemType,
    pub part_number: Option<String>,
    pub warranty_info: Option<String>,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ServiceItemListResponse {
    pub service_items: Vec<ServiceItemResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Unit price must be non-negative and quantity strictly positive.
pub(crate) fn validate_item_economics(price: Decimal, quantity: i32) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Price must not be negative".to_string(),
        ));
    }
    if quantity <= 0 {
        return Err(ServiceError::InvalidInput(
            "Quantity must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Service for the line-item ledger behind invoices.
///
/// Items may exist detached (no invoice reference); the startup reconciliation
/// sweep deletes any that stay that way, along with items whose invoice no
/// longer exists.
#[derive(Clone)]
pub struct ServiceItemService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ServiceItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateServiceItemRequest,
    ) -> Result<ServiceItemResponse, ServiceError> {
        request.validate()?;
        validate_item_economics(request.price, request.quantity)?;

        let db = &*self.db_pool;

        if let Some(invoice_id) = request.invoice_id {
            InvoiceEntity::find_by_id(invoice_id)
                .one(db)
                .await
                .map_err(|e| {
                    error!(error = %e, invoice_id = %invoice_id, "Failed to resolve invoice");
                    ServiceError::DatabaseError(e)
                })?
                .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;
        }

        let item_id = Uuid::new_v4();

        let model = ServiceItemActiveModel {
            id: Set(item_id),
            invoice_id: Set(request.invoice_id),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            quantity: Set(request.quantity),
            item_type: Set(request.item_type),
            part_number: Set(request.part_number),
            warranty_info: Set(request.warranty_info),
            created_at: Set(Utc::now()),
        };

        let item_model = model.insert(db).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to create service item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, detached = item_model.invoice_id.is_none(), "Service item created");
        self.event_sender.send(Event::ServiceItemCreated(item_id)).await;

        Ok(model_to_response(item_model))
    }

    /// Creates an item against the invoice of an existing service request.
    /// The request and its invoice must both already exist.
    #[instrument(skip(self, request), fields(request_id = %service_request_id))]
    pub async fn attach_to_service_request(
        &self,
        service_request_id: Uuid,
        request: CreateServiceItemRequest,
    ) -> Result<ServiceItemResponse, ServiceError> {
        let db = &*self.db_pool;

        ServiceRequestEntity::find_by_id(service_request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %service_request_id, "Failed to resolve service request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;

        let invoice_model = InvoiceEntity::find()
            .filter(invoice::Column::ServiceRequestId.eq(service_request_id))
            .order_by_desc(invoice::Column::CreatedAt)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %service_request_id, "Failed to look up invoice for request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound("No invoice exists for this service request".to_string())
            })?;

        self.create_item(CreateServiceItemRequest {
            invoice_id: Some(invoice_model.id),
            ..request
        })
        .await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<ServiceItemResponse>, ServiceError> {
        let db = &*self.db_pool;

        let item_model = ServiceItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch service item");
                ServiceError::DatabaseError(e)
            })?;

        Ok(item_model.map(model_to_response))
    }

    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ServiceItemListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = ServiceItemEntity::find()
            .order_by_desc(service_item::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count service items");
            ServiceError::DatabaseError(e)
        })?;

        let items = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch service items page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(ServiceItemListResponse {
            service_items: items.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Items on one invoice. The invoice itself must exist.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_items_by_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<ServiceItemResponse>, ServiceError> {
        let db = &*self.db_pool;

        InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to resolve invoice");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let items = ServiceItemEntity::find()
            .filter(service_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(service_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to fetch invoice items");
                ServiceError::DatabaseError(e)
            })?;

        Ok(items.into_iter().map(model_to_response).collect())
    }

    /// Overwrites every mutable field. Supplying an invoice_id re-links the
    /// item (the target invoice must exist); omitting it keeps the current
    /// link untouched.
    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        request: UpdateServiceItemRequest,
    ) -> Result<ServiceItemResponse, ServiceError> {
        request.validate()?;
        validate_item_economics(request.price, request.quantity)?;

        let db = &*self.db_pool;

        let item_model = ServiceItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch service item for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service item not found".to_string()))?;

        if let Some(invoice_id) = request.invoice_id {
            if item_model.invoice_id != Some(invoice_id) {
                InvoiceEntity::find_by_id(invoice_id)
                    .one(db)
                    .await
                    .map_err(|e| {
                        error!(error = %e, invoice_id = %invoice_id, "Failed to resolve invoice for re-link");
                        ServiceError::DatabaseError(e)
                    })?
                    .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;
            }
        }

        let mut active: ServiceItemActiveModel = item_model.into();
        if let Some(invoice_id) = request.invoice_id {
            active.invoice_id = Set(Some(invoice_id));
        }
        active.name = Set(request.name);
        active.description = Set(request.description);
        active.price = Set(request.price);
        active.quantity = Set(request.quantity);
        active.item_type = Set(request.item_type);
        active.part_number = Set(request.part_number);
        active.warranty_info = Set(request.warranty_info);

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to update service item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, "Service item updated");
        self.event_sender.send(Event::ServiceItemUpdated(item_id)).await;

        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let item_model = ServiceItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch service item for deletion");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service item not found".to_string()))?;

        item_model.delete(db).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to delete service item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %item_id, "Service item deleted");
        self.event_sender.send(Event::ServiceItemDeleted(item_id)).await;

        Ok(())
    }

    /// Deletes every item whose invoice reference is NULL or points at an
    /// invoice that no longer exists. Runs at startup before serving; also
    /// callable directly.
    #[instrument(skip(self))]
    pub async fn reconcile_orphans(&self) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;

        let orphaned: Vec<Uuid> = ServiceItemEntity::find()
            .join(JoinType::LeftJoin, service_item::Relation::Invoice.def())
            .filter(
                Condition::any()
                    .add(service_item::Column::InvoiceId.is_null())
                    .add(invoice::Column::Id.is_null()),
            )
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to scan for orphaned service items");
                ServiceError::DatabaseError(e)
            })?
            .into_iter()
            .map(|item| item.id)
            .collect();

        if orphaned.is_empty() {
            info!("No orphaned service items found");
            return Ok(0);
        }

        let result = ServiceItemEntity::delete_many()
            .filter(service_item::Column::Id.is_in(orphaned))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to purge orphaned service items");
                ServiceError::DatabaseError(e)
            })?;

        let count = result.rows_affected;
        warn!(count = count, "Purged orphaned service items");
        self.event_sender
            .send(Event::OrphanedItemsPurged { count })
            .await;

        Ok(count)
    }
}

fn model_to_response(model: ServiceItemModel) -> ServiceItemResponse {
    let subtotal = model.subtotal();
    ServiceItemResponse {
        id: model.id,
        invoice_id: model.invoice_id,
        name: model.name,
        description: model.description,
        price: model.price,
        quantity: model.quantity,
        item_type: model.item_type,
        part_number: model.part_number,
        warranty_info: model.warranty_info,
        subtotal,
        created_at: model.created_at,
    }
}
