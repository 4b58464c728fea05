use std::sync::Arc;

use tokio::sync::mpsc;

use super::StaticChainQuery;
use crate::{
    config::NameParams,
    engine::alert_manager::AlertManager,
    models::notification::Notification,
    persistence::sqlite::SqliteStateRepository,
};

/// Everything an engine test needs: the manager, its storage, its chain and
/// the receiving end of its notification channel.
pub struct TestAlertManager {
    /// The manager under test.
    pub manager: Arc<AlertManager<SqliteStateRepository, StaticChainQuery>>,
    /// The in-memory storage behind the manager.
    pub repository: Arc<SqliteStateRepository>,
    /// The chain behind the manager.
    pub chain: Arc<StaticChainQuery>,
    /// Notifications sent by the manager.
    pub notifications: mpsc::Receiver<Notification>,
}

impl TestAlertManager {
    /// Drains every notification sent so far.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut notifications = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            notifications.push(notification);
        }
        notifications
    }
}

/// A helper function to create an AlertManager with an in-memory
/// SqliteStateRepository, an empty chain and mainnet name parameters.
pub async fn create_test_alert_manager() -> TestAlertManager {
    let repository = SqliteStateRepository::new("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");
    repository.run_migrations().await.expect("Failed to run migrations");
    let repository = Arc::new(repository);
    let chain = Arc::new(StaticChainQuery::new());
    let (tx, rx) = mpsc::channel(100);

    let manager = Arc::new(AlertManager::new(
        Arc::clone(&repository),
        Arc::clone(&chain),
        NameParams::MAINNET,
        tx,
    ));
    TestAlertManager { manager, repository, chain, notifications: rx }
}
