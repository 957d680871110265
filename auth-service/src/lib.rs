pub mod app;
pub mod config;
pub mod metrics;
pub mod passwords;
pub mod role_handlers;
pub mod store;
pub mod token_handlers;
pub mod user_handlers;

pub use app::{router, AppState};
pub use config::{load_service_config, ServiceConfig};
