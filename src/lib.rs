#![warn(missing_docs)]
//! Namewatch schedules and delivers alerts about Handshake name auctions and
//! arbitrary block heights.

pub mod config;
pub mod engine;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
