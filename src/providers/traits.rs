//! The interface for querying a Handshake node.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::{block::RawBlock, name_info::NameInfo};

/// Errors returned by a [`ChainQuery`] implementation.
#[derive(Error, Debug)]
pub enum ChainQueryError {
    /// The name is not a valid encoded Handshake name.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// No name matches the given name hash.
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// The requested block does not exist yet.
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// The node could not be reached or returned an error.
    #[error("Upstream query failed: {0}")]
    Upstream(String),
}

/// Read access to the chain, as provided by an hsd node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Height of the chain tip.
    async fn get_current_block_height(&self) -> Result<u64, ChainQueryError>;

    /// Current state of an encoded name.
    async fn get_name_info(&self, encoded_name: &str) -> Result<NameInfo, ChainQueryError>;

    /// The block at `height`, with transaction details.
    async fn get_block_by_height(&self, height: u64) -> Result<RawBlock, ChainQueryError>;

    /// The name whose hash is `name_hash`.
    async fn get_name_by_hash(&self, name_hash: &str) -> Result<String, ChainQueryError>;
}
