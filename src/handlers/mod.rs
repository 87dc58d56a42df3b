pub mod auth;
pub mod common;
pub mod invoices;
pub mod service_items;
pub mod service_requests;
pub mod users;
pub mod vehicles;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<crate::services::UserService>,
    pub vehicles: Arc<crate::services::VehicleService>,
    pub service_requests: Arc<crate::services::ServiceRequestService>,
    pub invoices: Arc<crate::services::InvoiceService>,
    pub service_items: Arc<crate::services::ServiceItemService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            users: Arc::new(crate::services::UserService::new(
                db_pool.clone(),
                event_sender.clone(),
                auth,
            )),
            vehicles: Arc::new(crate::services::VehicleService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            service_requests: Arc::new(crate::services::ServiceRequestService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            invoices: Arc::new(crate::services::InvoiceService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            service_items: Arc::new(crate::services::ServiceItemService::new(
                db_pool,
                event_sender,
            )),
        }
    }
}
