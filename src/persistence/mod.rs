//! Durable storage for alerts, their triggers and block processing progress.

pub mod error;
pub mod sqlite;
pub use sqlite::SqliteStateRepository;
pub mod traits;
