pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::realtime::ChangeFeed;
pub use router::{
    appointment_routes, blocked_time_routes, booking_routes, recipient_routes, reminder_routes,
};
