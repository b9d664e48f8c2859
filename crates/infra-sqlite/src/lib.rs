// Vivid Infrastructure - SQLite Adapter
// Implements: RateWindowRepository

mod connection;
mod error;
mod migration;
mod rate_window_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use rate_window_repository::SqliteRateWindowRepository;

// Note: sqlx::Error conversion is handled by a helper function
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
