//! The BlockWatcher module polls the chain for new blocks and feeds each of
//! them, in order, to the alert engine.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::alert_manager::{AlertManager, AlertManagerError},
    models::{block::NewBlockEvent, name_action::NameAction},
    persistence::{error::PersistenceError, traits::AlertRepository},
    providers::{
        name_actions_from_block,
        traits::{ChainQuery, ChainQueryError},
    },
};

/// Errors that stop a polling cycle. The failed block is retried on the next
/// cycle.
#[derive(Debug, Error)]
pub enum BlockWatcherError {
    /// The chain could not be queried.
    #[error("Chain query error: {0}")]
    ChainQuery(#[from] ChainQueryError),

    /// Block progress could not be read or written.
    #[error("State repository error: {0}")]
    Storage(#[from] PersistenceError),

    /// The alert engine failed to process a block.
    #[error("Alert manager error: {0}")]
    AlertManager(#[from] AlertManagerError),
}

/// The BlockWatcher service.
///
/// Each cycle processes every block between the last processed block and the
/// chain tip. A block is recorded as processed only after the alert engine
/// handled it.
pub struct BlockWatcher<R: AlertRepository + ?Sized, C: ChainQuery + ?Sized> {
    /// Shared application configuration.
    config: Arc<AppConfig>,
    /// Block processing progress.
    repository: Arc<R>,
    /// The chain to poll.
    chain: Arc<C>,
    /// The engine that handles each block.
    alert_manager: Arc<AlertManager<R, C>>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
}

impl<R: AlertRepository + ?Sized, C: ChainQuery + ?Sized> BlockWatcher<R, C> {
    /// Creates a new BlockWatcher instance.
    pub fn new(
        config: Arc<AppConfig>,
        repository: Arc<R>,
        chain: Arc<C>,
        alert_manager: Arc<AlertManager<R, C>>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { config, repository, chain, alert_manager, cancellation_token }
    }

    /// Starts the long-running service loop.
    pub async fn run(self) {
        loop {
            let polling_delay = tokio::time::sleep(self.config.polling_interval_ms);

            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("BlockWatcher cancellation signal received, shutting down...");
                    break;
                }

                _ = polling_delay => {
                    if let Err(e) = self.process_new_blocks().await {
                        tracing::error!(error = %e, "Error during block processing cycle. Retrying after delay...");
                    }
                }
            }
        }
        tracing::info!("BlockWatcher has shut down.");
    }

    /// Processes every block up to the chain tip. Returns the number of
    /// blocks processed.
    pub async fn process_new_blocks(&self) -> Result<u64, BlockWatcherError> {
        let current_block = self.chain.get_current_block_height().await?;
        let from_block = match self.repository.get_last_processed_block().await? {
            Some(last) => last + 1,
            None => self.config.initial_start_block.resolve(current_block),
        };

        if from_block > current_block {
            tracing::debug!(current_block, "No new blocks.");
            return Ok(0);
        }

        tracing::info!(from_block, to_block = current_block, "Processing block range.");

        let mut processed = 0;
        for block_height in from_block..=current_block {
            if self.cancellation_token.is_cancelled() {
                tracing::info!("Cancellation requested, stopping block processing.");
                break;
            }

            let event = self.fetch_block(block_height).await?;
            let report = self.alert_manager.on_new_block(block_height, &event.name_actions).await?;
            self.repository.record_processed_block(block_height, &event.block_hash).await?;

            tracing::debug!(
                block_height,
                actions = event.name_actions.len(),
                notifications = report.name_alerts_sent,
                "Block processed."
            );
            processed += 1;
        }

        Ok(processed)
    }

    /// Fetches a block and decodes its name actions, resolving names that
    /// the covenants only carry as hashes.
    async fn fetch_block(&self, block_height: u64) -> Result<NewBlockEvent, BlockWatcherError> {
        let block = self.chain.get_block_by_height(block_height).await?;
        let mut name_actions = name_actions_from_block(&block);
        self.resolve_names(&mut name_actions).await?;

        Ok(NewBlockEvent { block_height, block_hash: block.hash, name_actions })
    }

    async fn resolve_names(&self, name_actions: &mut [NameAction]) -> Result<(), ChainQueryError> {
        for action in name_actions.iter_mut().filter(|a| a.name.is_none()) {
            match self.chain.get_name_by_hash(&action.name_hash).await {
                Ok(name) => action.name = Some(name),
                Err(ChainQueryError::NameNotFound(hash)) => {
                    tracing::warn!(name_hash = %hash, kind = %action.kind(), "Name hash not known to the node.");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
