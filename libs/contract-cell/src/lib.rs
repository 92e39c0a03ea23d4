// Employment contract intake and review.

pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use router::contract_routes;
