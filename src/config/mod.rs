//! Configuration module for namewatch.

mod app_config;
mod helpers;
mod initial_start_block;
mod name_params;

pub use app_config::AppConfig;
pub use helpers::{deserialize_duration_from_ms, deserialize_duration_from_seconds};
pub use initial_start_block::InitialStartBlock;
pub use name_params::NameParams;
