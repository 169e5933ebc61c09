/// Process configuration from dashboard.toml and environment variables
pub mod app;

/// Database connection management and table creation
pub mod database;

pub use app::{AppConfig, bootstrap_token, load_app_configuration};
