//! Access to the Handshake chain: the query interface and covenant decoding.

pub mod name_actions;
pub mod traits;

pub use name_actions::{DecodeError, name_action_from_output, name_actions_from_block};
pub use traits::{ChainQuery, ChainQueryError};
