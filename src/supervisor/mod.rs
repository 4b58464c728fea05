//! The Supervisor module manages the lifecycle of the alert engine.
//!
//! It owns the storage handle, the chain client and the alert manager, runs
//! the block watcher as a supervised task and shuts everything down on
//! `SIGINT` or `SIGTERM`.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` checks that storage and the
//!   chain are usable and wires the services together.
//! - **Lifecycle Management**: The `Supervisor` starts the block watcher and
//!   monitors it through a `JoinSet`.
//! - **Graceful Shutdown**: On a shutdown signal, or when a supervised task
//!   fails, every task is stopped and the storage pool is closed within the
//!   configured timeout.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{alert_manager::AlertManager, block_watcher::BlockWatcher},
    models::notification::Notification,
    persistence::{error::PersistenceError, sqlite::SqliteStateRepository, traits::AlertRepository},
    providers::traits::{ChainQuery, ChainQueryError},
};

/// The alert manager as wired by the supervisor.
pub type SupervisedAlertManager = AlertManager<SqliteStateRepository, dyn ChainQuery>;

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state repository was not provided to the `SupervisorBuilder`.
    #[error("Missing state repository for Supervisor")]
    MissingStateRepository,

    /// A chain client was not provided to the `SupervisorBuilder`.
    #[error("Missing chain query client for Supervisor")]
    MissingChainQuery,

    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The state repository could not be prepared.
    #[error("State repository error: {0}")]
    Storage(#[from] PersistenceError),

    /// The chain could not be reached.
    #[error("Chain query error: {0}")]
    ChainQuery(#[from] ChainQueryError),
}

/// The primary runtime manager for the application.
///
/// Once `run` is called, it becomes the main process loop until shutdown.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// Storage for alerts and block progress.
    repository: Arc<SqliteStateRepository>,

    /// The chain client.
    chain: Arc<dyn ChainQuery>,

    /// The alert engine, shared with the subscriber-facing layer.
    alert_manager: Arc<SupervisedAlertManager>,

    /// The receiving end of the notification channel, until taken.
    notifications: Option<mpsc::Receiver<Notification>>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    ///
    /// This is typically called by the `SupervisorBuilder` after it has
    /// assembled all the necessary dependencies.
    pub fn new(
        config: AppConfig,
        repository: Arc<SqliteStateRepository>,
        chain: Arc<dyn ChainQuery>,
        alert_manager: Arc<SupervisedAlertManager>,
        notifications: mpsc::Receiver<Notification>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            repository,
            chain,
            alert_manager,
            notifications: Some(notifications),
            cancellation_token: CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The alert engine, for creating and querying subscriptions.
    pub fn alert_manager(&self) -> Arc<SupervisedAlertManager> {
        Arc::clone(&self.alert_manager)
    }

    /// Takes the receiving end of the notification channel. Returns `None`
    /// after the first call.
    pub fn take_notifications(&mut self) -> Option<mpsc::Receiver<Notification>> {
        self.notifications.take()
    }

    /// A token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts the supervisor and all its managed services, and runs until
    /// shutdown.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => cancellation_token.cancel(),
                _ = cancellation_token.cancelled() => {}
            }
        });

        let block_watcher = BlockWatcher::new(
            Arc::clone(&self.config),
            Arc::clone(&self.repository),
            Arc::clone(&self.chain),
            Arc::clone(&self.alert_manager),
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move {
            block_watcher.run().await;
        });

        // --- Main Supervisor Loop ---
        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!(error = ?e, "A critical task failed. Initiating shutdown.");
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        // --- Graceful Shutdown ---
        let shutdown_timeout = self.config.shutdown_timeout;
        if tokio::time::timeout(shutdown_timeout, self.join_set.shutdown()).await.is_err() {
            tracing::warn!(?shutdown_timeout, "Supervised tasks did not stop within the timeout.");
        } else {
            tracing::info!("All supervised tasks have completed.");
        }

        let cleanup_logic = async {
            match self.repository.get_last_processed_block().await {
                Ok(Some(last_block)) => tracing::info!(
                    last_processed_block = last_block,
                    "Final state: last processed block recorded."
                ),
                Ok(None) => tracing::info!("Final state: no blocks have been processed yet."),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not retrieve final state during cleanup.")
                }
            }
            self.repository.close().await;
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(?shutdown_timeout, "Cleanup did not complete within the timeout.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}

/// Resolves on the first `SIGINT` or `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
    }
}
