pub mod invoices;
pub mod service_items;
pub mod service_requests;
pub mod users;
pub mod vehicles;

pub use invoices::InvoiceService;
pub use service_items::ServiceItemService;
pub use service_requests::ServiceRequestService;
pub use users::UserService;
pub use vehicles::VehicleService;
