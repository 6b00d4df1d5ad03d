//! Database module
//!
//! SQLite integration using sqlx with:
//! - Connection pool management and embedded migrations
//! - Row types with FromRow
//! - Repository functions per table, plus the [`SqliteSessionRepository`]
//!   adapter the session store talks to

pub mod models;
pub mod pool;
pub mod repository;

// Re-export commonly used items
pub use models::PinRow;
pub use pool::{create_pool, health_check, run_migrations};
pub use repository::SqliteSessionRepository;
