//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    config::AppConfig, engine::alert_manager::AlertManager,
    persistence::sqlite::SqliteStateRepository, providers::traits::ChainQuery,
};

use super::{Supervisor, SupervisorError};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    repository: Option<Arc<SqliteStateRepository>>,
    chain: Option<Arc<dyn ChainQuery>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state repository (database connection) for the `Supervisor`.
    pub fn repository(mut self, repository: Arc<SqliteStateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Sets the chain client (e.g., the node RPC) for the `Supervisor`.
    pub fn chain(mut self, chain: Arc<dyn ChainQuery>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// Runs the database migrations and checks that the chain answers before
    /// wiring the alert manager to a new notification channel.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let repository = self.repository.ok_or(SupervisorError::MissingStateRepository)?;
        let chain = self.chain.ok_or(SupervisorError::MissingChainQuery)?;

        if config.notification_channel_capacity == 0 {
            return Err(SupervisorError::InvalidConfiguration(
                "notification_channel_capacity must be greater than zero".into(),
            ));
        }

        repository.run_migrations().await?;

        let current_block = chain.get_current_block_height().await?;
        let params = config.name_params();
        tracing::info!(
            network_id = %config.network_id,
            current_block,
            bidding_period = params.bidding_period,
            reveal_period = params.reveal_period,
            "Connected to chain."
        );

        let (notifications_tx, notifications_rx) =
            mpsc::channel(config.notification_channel_capacity as usize);
        let alert_manager = Arc::new(AlertManager::new(
            Arc::clone(&repository),
            Arc::clone(&chain),
            params,
            notifications_tx,
        ));

        Ok(Supervisor::new(config, repository, chain, alert_manager, notifications_rx))
    }
}
