pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::executor::CommandExecutor;
pub use router::bot_routes;
