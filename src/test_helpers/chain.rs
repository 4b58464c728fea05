//! An in-memory `ChainQuery` for tests that need a chain without mocking
//! every call.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use crate::{
    models::{block::RawBlock, name_info::NameInfo},
    providers::traits::{ChainQuery, ChainQueryError},
};

#[derive(Debug, Default)]
struct ChainState {
    height: u64,
    name_infos: HashMap<String, NameInfo>,
    blocks: HashMap<u64, RawBlock>,
    names_by_hash: HashMap<String, String>,
    failing_names: HashSet<String>,
    name_info_calls: Vec<String>,
}

/// A chain served from memory. Every setter can be called while the chain is
/// shared with the code under test.
#[derive(Debug, Default)]
pub struct StaticChainQuery {
    state: Mutex<ChainState>,
}

impl StaticChainQuery {
    /// Creates an empty chain at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the chain tip height.
    pub fn set_height(&self, height: u64) {
        self.state().height = height;
    }

    /// Sets the snapshot returned for `name`.
    pub fn set_name_info(&self, name: &str, info: NameInfo) {
        self.state().name_infos.insert(name.to_string(), info);
    }

    /// Makes name info lookups for `name` fail with an upstream error.
    pub fn fail_name(&self, name: &str) {
        self.state().failing_names.insert(name.to_string());
    }

    /// Adds a block, indexed by its height.
    pub fn add_block(&self, block: RawBlock) {
        self.state().blocks.insert(block.height, block);
    }

    /// Registers the name behind a name hash.
    pub fn set_name_hash(&self, name_hash: &str, name: &str) {
        self.state().names_by_hash.insert(name_hash.to_string(), name.to_string());
    }

    /// Names passed to `get_name_info`, in call order.
    pub fn name_info_calls(&self) -> Vec<String> {
        self.state().name_info_calls.clone()
    }
}

#[async_trait]
impl ChainQuery for StaticChainQuery {
    async fn get_current_block_height(&self) -> Result<u64, ChainQueryError> {
        Ok(self.state().height)
    }

    async fn get_name_info(&self, encoded_name: &str) -> Result<NameInfo, ChainQueryError> {
        let mut state = self.state();
        state.name_info_calls.push(encoded_name.to_string());
        if state.failing_names.contains(encoded_name) {
            return Err(ChainQueryError::Upstream(format!("getnameinfo {encoded_name} failed")));
        }
        Ok(state.name_infos.get(encoded_name).cloned().unwrap_or_default())
    }

    async fn get_block_by_height(&self, height: u64) -> Result<RawBlock, ChainQueryError> {
        self.state().blocks.get(&height).cloned().ok_or(ChainQueryError::BlockNotFound(height))
    }

    async fn get_name_by_hash(&self, name_hash: &str) -> Result<String, ChainQueryError> {
        self.state()
            .names_by_hash
            .get(name_hash)
            .cloned()
            .ok_or_else(|| ChainQueryError::NameNotFound(name_hash.to_string()))
    }
}
