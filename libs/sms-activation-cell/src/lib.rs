pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::activation::SmsActivationService;
pub use router::sms_request_routes;
