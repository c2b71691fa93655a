//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations only translate between Diesel rows and domain
//! types. Lifecycle guards live in the `WHERE` clauses of conditional
//! updates, so the database arbitrates concurrent writers.
//!
//! # Example
//!
//! ```ignore
//! use canary_backend::outbound::persistence::{DbPool, DieselWarrantRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/canary")).await?;
//! let warrants = DieselWarrantRepository::new(pool);
//! ```

mod diesel_canary_repository;
mod diesel_error_mapping;
mod diesel_notification_preferences_repository;
mod diesel_subscription_repository;
mod diesel_trusted_canary_repository;
mod diesel_warrant_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_canary_repository::DieselCanaryRepository;
pub use diesel_notification_preferences_repository::DieselNotificationPreferencesRepository;
pub use diesel_subscription_repository::DieselSubscriptionRepository;
pub use diesel_trusted_canary_repository::DieselTrustedCanaryRepository;
pub use diesel_warrant_repository::DieselWarrantRepository;
pub use migrations::run_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
