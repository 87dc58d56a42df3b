pub mod invoice;
pub mod service_item;
pub mod service_request;
pub mod user;
pub mod vehicle;

pub use invoice::InvoiceStatus;
pub use service_item::ServiceItemType;
pub use service_request::{ServicePriority, ServiceRequestStatus};
pub use user::UserRole;
