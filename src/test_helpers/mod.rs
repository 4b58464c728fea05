//! A set of helpers for testing

mod alert_manager;
mod block;
mod chain;
mod name_info;

pub use alert_manager::{TestAlertManager, create_test_alert_manager};
pub use block::{BlockBuilder, covenant_output, plain_output};
pub use chain::StaticChainQuery;
pub use name_info::{NameInfoBuilder, fixtures};
