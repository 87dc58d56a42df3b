use crate::{
    db::DbPool,
    entities::invoice::{
        self, ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity, Model as InvoiceModel,
    },
    entities::service_item::{
        self, ActiveModel as ServiceItemActiveModel, Entity as ServiceItemEntity,
    },
    entities::service_request::Entity as ServiceRequestEntity,
    entities::{InvoiceStatus, ServiceItemType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::service_items::{validate_item_economics, ServiceItemResponse},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// A line item supplied inline with an invoice. The invoice reference is
/// implied by the enclosing call.
#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceItemInput {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub item_type: ServiceItemType,
    pub part_number: Option<String>,
    pub warranty_info: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub service_request_id: Uuid,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_zip: Option<String>,
    #[validate]
    pub items: Vec<InvoiceItemInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub status: InvoiceStatus,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_zip: Option<String>,
    pub payment_method: Option<String>,
    #[validate(length(min = 4, max = 4, message = "Card last four must be 4 digits"))]
    pub card_last_four: Option<String>,
    #[validate]
    pub items: Vec<InvoiceItemInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    #[validate(length(min = 4, max = 4, message = "Card last four must be 4 digits"))]
    pub card_last_four: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_zip: Option<String>,
    pub payment_method: Option<String>,
    pub card_last_four: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub items: Vec<ServiceItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Billing engine. The invoice total is never taken from the caller: it is
/// always recomputed as the sum of price times quantity over the line items
/// actually persisted.
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an invoice for a service request together with its line items.
    ///
    /// The request is resolved before anything is written, so a bad id leaves
    /// the database untouched. Inside the transaction an individual item
    /// insert failure is logged and the remaining items are still attempted;
    /// the total reflects exactly the items that made it in.
    #[instrument(skip(self, request), fields(service_request_id = %request.service_request_id, item_count = request.items.len()))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            validate_item_economics(item.price, item.quantity)?;
        }

        let db = &*self.db_pool;

        ServiceRequestEntity::find_by_id(request.service_request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request.service_request_id, "Failed to resolve service request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;

        let invoice_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start invoice creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        let invoice_active = InvoiceActiveModel {
            id: Set(invoice_id),
            service_request_id: Set(request.service_request_id),
            total_amount: Set(Decimal::ZERO),
            status: Set(InvoiceStatus::Pending),
            billing_address: Set(request.billing_address),
            billing_city: Set(request.billing_city),
            billing_zip: Set(request.billing_zip),
            payment_method: Set(None),
            card_last_four: Set(None),
            created_at: Set(now),
            paid_at: Set(None),
        };

        let invoice_model = invoice_active.insert(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to create invoice");
            ServiceError::DatabaseError(e)
        })?;

        attach_items(&txn, invoice_id, request.items).await;

        let invoice_model = finalize_total(&txn, invoice_model).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to commit invoice creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            invoice_id = %invoice_id,
            total = %invoice_model.total_amount,
            "Invoice created"
        );
        self.event_sender.send(Event::InvoiceCreated(invoice_id)).await;

        let items = self.load_items(invoice_id).await?;
        Ok(model_to_response(invoice_model, items))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceResponse>, ServiceError> {
        let db = &*self.db_pool;

        let invoice_model = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to fetch invoice");
                ServiceError::DatabaseError(e)
            })?;

        match invoice_model {
            Some(model) => {
                let items = self.load_items(invoice_id).await?;
                Ok(Some(model_to_response(model, items)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<InvoiceListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = InvoiceEntity::find().order_by_desc(invoice::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(invoice::Column::Status.eq(status));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count invoices");
            ServiceError::DatabaseError(e)
        })?;

        let invoice_models = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch invoices page");
            ServiceError::DatabaseError(e)
        })?;

        let mut invoices = Vec::with_capacity(invoice_models.len());
        for model in invoice_models {
            let items = self.load_items(model.id).await?;
            invoices.push(model_to_response(model, items));
        }

        Ok(InvoiceListResponse {
            invoices,
            total,
            page,
            per_page,
        })
    }

    /// All invoices referencing a service request, newest first. Conceptually
    /// at most one, but the shape is a list and uniqueness is not enforced.
    #[instrument(skip(self), fields(request_id = %service_request_id))]
    pub async fn get_by_service_request(
        &self,
        service_request_id: Uuid,
    ) -> Result<Vec<InvoiceResponse>, ServiceError> {
        let db = &*self.db_pool;

        ServiceRequestEntity::find_by_id(service_request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %service_request_id, "Failed to resolve service request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Service request not found".to_string()))?;

        let invoice_models = InvoiceEntity::find()
            .filter(invoice::Column::ServiceRequestId.eq(service_request_id))
            .order_by_desc(invoice::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %service_request_id, "Failed to fetch invoices for request");
                ServiceError::DatabaseError(e)
            })?;

        let mut invoices = Vec::with_capacity(invoice_models.len());
        for model in invoice_models {
            let items = self.load_items(model.id).await?;
            invoices.push(model_to_response(model, items));
        }

        Ok(invoices)
    }

    /// Wholesale overwrite: status, billing and payment fields are replaced
    /// from the supplied values, the item collection is cleared and re-added,
    /// and the total is recomputed, all in one transaction.
    #[instrument(skip(self, request), fields(invoice_id = %invoice_id, item_count = request.items.len()))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        request: UpdateInvoiceRequest,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            validate_item_economics(item.price, item.quantity)?;
        }

        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to start invoice update transaction");
            ServiceError::DatabaseError(e)
        })?;

        let invoice_model = InvoiceEntity::find_by_id(invoice_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to fetch invoice for update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let mut active: InvoiceActiveModel = invoice_model.into();
        active.status = Set(request.status);
        active.billing_address = Set(request.billing_address);
        active.billing_city = Set(request.billing_city);
        active.billing_zip = Set(request.billing_zip);
        active.payment_method = Set(request.payment_method);
        active.card_last_four = Set(request.card_last_four);

        let invoice_model = active.update(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to update invoice fields");
            ServiceError::DatabaseError(e)
        })?;

        ServiceItemEntity::delete_many()
            .filter(service_item::Column::InvoiceId.eq(invoice_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to clear invoice items");
                ServiceError::DatabaseError(e)
            })?;

        attach_items(&txn, invoice_id, request.items).await;

        let invoice_model = finalize_total(&txn, invoice_model).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to commit invoice update");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            invoice_id = %invoice_id,
            total = %invoice_model.total_amount,
            "Invoice updated"
        );
        self.event_sender.send(Event::InvoiceUpdated(invoice_id)).await;

        let items = self.load_items(invoice_id).await?;
        Ok(model_to_response(invoice_model, items))
    }

    /// Marks the invoice paid. The overwrite is unconditional: paying an
    /// already-Completed invoice succeeds and re-stamps `paid_at`.
    #[instrument(skip(self, request), fields(invoice_id = %invoice_id, payment_method = %request.payment_method))]
    pub async fn process_payment(
        &self,
        invoice_id: Uuid,
        request: ProcessPaymentRequest,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let invoice_model = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to fetch invoice for payment");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        if invoice_model.status == InvoiceStatus::Completed {
            warn!(invoice_id = %invoice_id, "Re-processing payment for a completed invoice");
        }

        let payment_method = request.payment_method.clone();
        let mut active: InvoiceActiveModel = invoice_model.into();
        active.status = Set(InvoiceStatus::Completed);
        active.payment_method = Set(Some(request.payment_method));
        active.card_last_four = Set(request.card_last_four);
        active.paid_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to process payment");
            ServiceError::DatabaseError(e)
        })?;

        info!(invoice_id = %invoice_id, "Payment processed");
        self.event_sender
            .send(Event::PaymentProcessed {
                invoice_id,
                payment_method,
            })
            .await;

        let items = self.load_items(invoice_id).await?;
        Ok(model_to_response(updated, items))
    }

    /// Removes the invoice row only. Its items are detached by the schema and
    /// left for the startup reconciliation sweep.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let invoice_model = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to fetch invoice for deletion");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        invoice_model.delete(db).await.map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to delete invoice");
            ServiceError::DatabaseError(e)
        })?;

        info!(invoice_id = %invoice_id, "Invoice deleted");
        self.event_sender.send(Event::InvoiceDeleted(invoice_id)).await;

        Ok(())
    }

    async fn load_items(&self, invoice_id: Uuid) -> Result<Vec<ServiceItemResponse>, ServiceError> {
        let db = &*self.db_pool;

        let items = ServiceItemEntity::find()
            .filter(service_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(service_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id = %invoice_id, "Failed to load invoice items");
                ServiceError::DatabaseError(e)
            })?;

        Ok(items
            .into_iter()
            .map(|item| ServiceItemResponse {
                id: item.id,
                invoice_id: item.invoice_id,
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                quantity: item.quantity,
                item_type: item.item_type,
                part_number: item.part_number.clone(),
                warranty_info: item.warranty_info.clone(),
                subtotal: item.price * Decimal::from(item.quantity),
                created_at: item.created_at,
            })
            .collect())
    }
}

/// Inserts line items against an invoice. A failed insert is logged and the
/// remaining items are still attempted.
async fn attach_items(txn: &DatabaseTransaction, invoice_id: Uuid, items: Vec<InvoiceItemInput>) {
    for item in items {
        let item_id = Uuid::new_v4();
        let active = ServiceItemActiveModel {
            id: Set(item_id),
            invoice_id: Set(Some(invoice_id)),
            name: Set(item.name),
            description: Set(item.description),
            price: Set(item.price),
            quantity: Set(item.quantity),
            item_type: Set(item.item_type),
            part_number: Set(item.part_number),
            warranty_info: Set(item.warranty_info),
            created_at: Set(Utc::now()),
        };

        // Each item gets its own savepoint: a failed INSERT would otherwise
        // abort the enclosing transaction on Postgres.
        let result = async {
            let savepoint = txn.begin().await?;
            active.insert(&savepoint).await?;
            savepoint.commit().await
        }
        .await;

        if let Err(e) = result {
            warn!(
                error = %e,
                invoice_id = %invoice_id,
                item_id = %item_id,
                "Failed to attach line item, continuing with the rest"
            );
        }
    }
}

/// Recomputes the invoice total from the items that were actually persisted
/// and writes it back. Runs after all attach attempts.
async fn finalize_total<C: ConnectionTrait>(
    conn: &C,
    invoice_model: InvoiceModel,
) -> Result<InvoiceModel, ServiceError> {
    let invoice_id = invoice_model.id;

    let items = ServiceItemEntity::find()
        .filter(service_item::Column::InvoiceId.eq(invoice_id))
        .all(conn)
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id = %invoice_id, "Failed to read back items for total");
            ServiceError::DatabaseError(e)
        })?;

    let total: Decimal = items.iter().map(|item| item.subtotal()).sum();

    let mut active: InvoiceActiveModel = invoice_model.into();
    active.total_amount = Set(total);
    active.update(conn).await.map_err(|e| {
        error!(error = %e, invoice_id = %invoice_id, "Failed to write invoice total");
        ServiceError::DatabaseError(e)
    })
}

fn model_to_response(model: InvoiceModel, items: Vec<ServiceItemResponse>) -> InvoiceResponse {
    InvoiceResponse {
        id: model.id,
        service_request_id: model.service_request_id,
        total_amount: model.total_amount,
        status: model.status,
        billing_address: model.billing_address,
        billing_city: model.billing_city,
        billing_zip: model.billing_zip,
        payment_method: model.payment_method,
        card_last_four: model.card_last_four,
        created_at: model.created_at,
        paid_at: model.paid_at,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn payment_request_rejects_short_card_suffix() {
        let request = ProcessPaymentRequest {
            payment_method: "CARD".to_string(),
            card_last_four: Some("12".to_string()),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn payment_request_accepts_cash_without_card() {
        let request = ProcessPaymentRequest {
            payment_method: "CASH".to_string(),
            card_last_four: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let items = [
            (dec!(45.00), 1),
            (dec!(19.99), 3),
        ];
        let total: Decimal = items
            .iter()
            .map(|(price, qty)| price * Decimal::from(*qty))
            .sum();
        assert_eq!(total, dec!(104.97));
    }
}
