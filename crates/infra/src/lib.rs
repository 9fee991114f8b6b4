//! Infrastructure layer: entity stores, application services, config.

pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use services::{ServiceError, ServiceResult};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};
