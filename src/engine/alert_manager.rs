//! Alert management module

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::{
    config::NameParams,
    engine::{
        firing::{fire_block_height_alerts, fire_name_alerts},
        milestones::calculate_all_future_milestones,
        reconciler::{ReconcileReport, reconcile_triggers},
    },
    models::{
        alert::{BlockHeightAlertSummary, BlockHeightTrigger, NameAlert, NewBlockHeightAlert},
        name::{clean_name, verify_name},
        name_action::NameAction,
        notification::Notification,
    },
    persistence::{error::PersistenceError, traits::AlertRepository},
    providers::traits::{ChainQuery, ChainQueryError},
};

/// Errors that can occur within the AlertManager
#[derive(Debug, Error)]
pub enum AlertManagerError {
    /// The request was rejected. Nothing was written.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The chain could not answer a query needed by the operation.
    #[error("Chain query error: {0}")]
    ChainQuery(#[from] ChainQueryError),

    /// Error occurred in the state repository
    #[error("State repository error: {0}")]
    Storage(#[from] PersistenceError),
}

/// What happened while processing one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockReport {
    /// Height of the processed block.
    pub block_height: u64,
    /// Outcome of trigger reconciliation.
    pub reconcile: ReconcileReport,
    /// Name alert notifications handed to the sink.
    pub name_alerts_sent: usize,
    /// Block height triggers marked as fired.
    pub triggers_fired: usize,
    /// Standalone block height alerts marked as fired.
    pub block_height_alerts_fired: usize,
}

/// The AlertManager schedules name alerts from chain state, keeps their
/// triggers up to date and fires them as blocks arrive.
pub struct AlertManager<R: AlertRepository + ?Sized, C: ChainQuery + ?Sized> {
    /// Storage for alerts and triggers.
    repository: Arc<R>,

    /// Read access to the chain.
    chain: Arc<C>,

    /// Auction timing of the network.
    params: NameParams,

    /// Where notifications are sent.
    notifications: mpsc::Sender<Notification>,

    /// Serialises block processing.
    block_lock: Mutex<()>,
}

impl<R: AlertRepository + ?Sized, C: ChainQuery + ?Sized> AlertManager<R, C> {
    /// Creates a new AlertManager instance
    pub fn new(
        repository: Arc<R>,
        chain: Arc<C>,
        params: NameParams,
        notifications: mpsc::Sender<Notification>,
    ) -> Self {
        Self { repository, chain, params, notifications, block_lock: Mutex::new(()) }
    }

    /// Subscribes a chat to a name and schedules a trigger for each of the
    /// name's future milestones.
    ///
    /// Creating the same subscription twice creates two alerts.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn create_name_alert(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<NameAlert, AlertManagerError> {
        let name = clean_name(name);
        if !verify_name(&name) {
            return Err(AlertManagerError::Validation(format!("invalid name: {name:?}")));
        }

        let current_height = self.chain.get_current_block_height().await?;
        let name_info = self.chain.get_name_info(&name).await.map_err(|e| match e {
            ChainQueryError::InvalidName(reason) => AlertManagerError::Validation(reason),
            other => other.into(),
        })?;

        let milestones = calculate_all_future_milestones(&name_info, current_height, &self.params);
        let alert = self.repository.create_name_alert(chat_id, &name, &milestones).await?;

        tracing::info!(
            chat_id,
            target_name = %name,
            current_height,
            triggers = alert.triggers.len(),
            "Name alert scheduled."
        );
        Ok(alert)
    }

    /// Whether the chat watches the name.
    pub async fn check_exists_name_alert(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<bool, AlertManagerError> {
        Ok(self.repository.name_alert_exists(chat_id, &clean_name(name)).await?)
    }

    /// Stops watching the name. Returns `false` if the chat was not watching
    /// it.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn delete_name_alert(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<bool, AlertManagerError> {
        Ok(self.repository.delete_name_alert(chat_id, &clean_name(name)).await? > 0)
    }

    /// Names the chat watches.
    pub async fn get_name_alerts(&self, chat_id: i64) -> Result<Vec<String>, AlertManagerError> {
        Ok(self.repository.get_name_alert_names(chat_id).await?)
    }

    /// Pending triggers of the chat's alert on the name, by ascending height.
    /// `None` if the chat does not watch the name.
    pub async fn get_name_alert_detail(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<Option<Vec<BlockHeightTrigger>>, AlertManagerError> {
        let Some(alert) = self.repository.get_name_alert(chat_id, &clean_name(name)).await? else {
            return Ok(None);
        };
        Ok(Some(self.repository.get_pending_triggers(alert.id).await?))
    }

    /// Schedules a standalone alert at a block height. Returns whether an
    /// alert was stored; with `enforce_unique`, nothing is stored if an
    /// identical unfired alert exists.
    #[tracing::instrument(skip(self, context), level = "debug")]
    pub async fn create_block_height_alert(
        &self,
        chat_id: i64,
        block_height: u64,
        alert_type: &str,
        context: Option<Value>,
        enforce_unique: bool,
    ) -> Result<bool, AlertManagerError> {
        if alert_type.is_empty() {
            return Err(AlertManagerError::Validation("alert type is required".into()));
        }
        let alert = NewBlockHeightAlert {
            chat_id,
            block_height,
            alert_type: alert_type.to_string(),
            context,
        };
        Ok(self.repository.create_block_height_alert(&alert, enforce_unique).await?)
    }

    /// Cancels unfired standalone alerts. Returns whether any was removed.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn delete_block_height_alert(
        &self,
        chat_id: i64,
        block_height: u64,
        alert_type: &str,
    ) -> Result<bool, AlertManagerError> {
        let removed =
            self.repository.delete_block_height_alert(chat_id, block_height, alert_type).await?;
        Ok(removed > 0)
    }

    /// Unfired standalone alerts of the chat, by ascending height.
    pub async fn get_block_height_alerts(
        &self,
        chat_id: i64,
    ) -> Result<Vec<BlockHeightAlertSummary>, AlertManagerError> {
        let alerts = self.repository.get_block_height_alerts(chat_id).await?;
        Ok(alerts.iter().map(BlockHeightAlertSummary::from).collect())
    }

    /// Processes a new block: reschedules triggers affected by its actions,
    /// then fires due name alerts and due standalone alerts.
    ///
    /// Concurrent calls run one after another. Calling again for the same
    /// block sends nothing new for stored triggers and alerts.
    #[tracing::instrument(skip(self, name_actions), fields(actions = name_actions.len()), level = "debug")]
    pub async fn on_new_block(
        &self,
        block_height: u64,
        name_actions: &[NameAction],
    ) -> Result<BlockReport, AlertManagerError> {
        let _guard = self.block_lock.lock().await;

        let reconcile = reconcile_triggers(
            self.repository.as_ref(),
            self.chain.as_ref(),
            &self.params,
            name_actions,
            block_height,
        )
        .await?;

        let name_alerts = fire_name_alerts(
            self.repository.as_ref(),
            name_actions,
            block_height,
            &self.notifications,
        )
        .await?;

        let block_height_alerts =
            fire_block_height_alerts(self.repository.as_ref(), block_height, &self.notifications)
                .await?;

        let report = BlockReport {
            block_height,
            reconcile,
            name_alerts_sent: name_alerts.notifications_sent,
            triggers_fired: name_alerts.items_fired,
            block_height_alerts_fired: block_height_alerts.items_fired,
        };
        tracing::debug!(?report, "Block processed.");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        models::milestone::MilestoneKind,
        persistence::traits::MockAlertRepository,
        providers::traits::MockChainQuery,
        test_helpers::{create_test_alert_manager, fixtures},
    };

    fn mocked_manager(
        repo: MockAlertRepository,
        chain: MockChainQuery,
    ) -> (AlertManager<MockAlertRepository, MockChainQuery>, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(10);
        (AlertManager::new(Arc::new(repo), Arc::new(chain), NameParams::MAINNET, tx), rx)
    }

    #[tokio::test]
    async fn test_create_name_alert_schedules_future_milestones() {
        let test = create_test_alert_manager().await;
        test.chain.set_height(69600);
        test.chain.set_name_info("ocer", fixtures::opening());

        let alert = test.manager.create_name_alert(7, "Ocer/").await.unwrap();

        assert_eq!(alert.target_name, "ocer");
        let kinds: Vec<_> = alert.triggers.iter().map(|t| t.milestone).collect();
        assert_eq!(
            kinds,
            vec![MilestoneKind::AuctionBidding, MilestoneKind::AuctionReveal, MilestoneKind::AuctionClosed]
        );
        assert!(test.manager.check_exists_name_alert(7, "ocer").await.unwrap());
        assert_eq!(test.manager.get_name_alerts(7).await.unwrap(), vec!["ocer"]);
    }

    #[tokio::test]
    async fn test_create_name_alert_rejects_invalid_names() {
        let mut repo = MockAlertRepository::new();
        repo.expect_create_name_alert().times(0);
        let mut chain = MockChainQuery::new();
        chain.expect_get_current_block_height().times(0);
        let (manager, _rx) = mocked_manager(repo, chain);

        for name in ["", "-ocer", "localhost", "o.cer"] {
            let result = manager.create_name_alert(1, name).await;
            assert!(matches!(result, Err(AlertManagerError::Validation(_))), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_create_name_alert_maps_chain_errors() {
        let mut repo = MockAlertRepository::new();
        repo.expect_create_name_alert().times(0);
        let mut chain = MockChainQuery::new();
        chain.expect_get_current_block_height().returning(|| Ok(100));
        chain.expect_get_name_info().returning(|name| match name {
            "rejected" => Err(ChainQueryError::InvalidName("rejected by node".into())),
            _ => Err(ChainQueryError::Upstream("connection refused".into())),
        });
        let (manager, _rx) = mocked_manager(repo, chain);

        let result = manager.create_name_alert(1, "rejected").await;
        assert!(matches!(result, Err(AlertManagerError::Validation(_))));

        let result = manager.create_name_alert(1, "ocer").await;
        assert!(matches!(result, Err(AlertManagerError::ChainQuery(ChainQueryError::Upstream(_)))));
    }

    #[tokio::test]
    async fn test_delete_name_alert() {
        let test = create_test_alert_manager().await;
        test.chain.set_name_info("ocer", fixtures::opening());
        test.manager.create_name_alert(7, "ocer").await.unwrap();

        assert!(test.manager.delete_name_alert(7, "ocer").await.unwrap());
        assert!(!test.manager.delete_name_alert(7, "ocer").await.unwrap());
        assert!(test.manager.get_name_alert_detail(7, "ocer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_name_alert_detail_lists_pending_triggers() {
        let test = create_test_alert_manager().await;
        test.chain.set_height(69000);
        test.chain.set_name_info("ocer", fixtures::opening());
        test.manager.create_name_alert(7, "ocer").await.unwrap();

        test.manager.on_new_block(69620, &[]).await.unwrap();

        let detail = test.manager.get_name_alert_detail(7, "ocer").await.unwrap().unwrap();
        let heights: Vec<_> = detail.iter().map(|t| t.block_height).collect();
        assert_eq!(heights, vec![70340, 71780]);
    }

    #[tokio::test]
    async fn test_block_height_alerts() {
        let mut test = create_test_alert_manager().await;
        let manager = &test.manager;

        assert!(manager.create_block_height_alert(7, 300, "REMIND", None, true).await.unwrap());
        assert!(!manager.create_block_height_alert(7, 300, "REMIND", None, true).await.unwrap());
        assert!(
            manager
                .create_block_height_alert(7, 200, "REMIND", Some(json!({"n": 1})), false)
                .await
                .unwrap()
        );

        let summaries = manager.get_block_height_alerts(7).await.unwrap();
        assert_eq!(
            summaries,
            vec![
                BlockHeightAlertSummary { block_height: 200, alert_type: "REMIND".into() },
                BlockHeightAlertSummary { block_height: 300, alert_type: "REMIND".into() },
            ]
        );

        assert!(manager.delete_block_height_alert(7, 300, "REMIND").await.unwrap());
        assert!(!manager.delete_block_height_alert(7, 300, "REMIND").await.unwrap());

        let report = manager.on_new_block(250, &[]).await.unwrap();
        assert_eq!(report.block_height_alerts_fired, 1);
        assert_eq!(test.drain_notifications().len(), 1);
        assert!(test.manager.get_block_height_alerts(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_block_height_alert_requires_type() {
        let mut repo = MockAlertRepository::new();
        repo.expect_create_block_height_alert().times(0);
        let (manager, _rx) = mocked_manager(repo, MockChainQuery::new());

        let result = manager.create_block_height_alert(1, 10, "", None, false).await;
        assert!(matches!(result, Err(AlertManagerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_on_new_block_surfaces_storage_errors() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_due_triggers()
            .returning(|_| Err(PersistenceError::OperationFailed("disk full".into())));
        let (manager, _rx) = mocked_manager(repo, MockChainQuery::new());

        let result = manager.on_new_block(10, &[]).await;
        assert!(matches!(result, Err(AlertManagerError::Storage(_))));
    }

    #[tokio::test]
    async fn test_on_new_block_reconciles_then_fires() {
        let mut test = create_test_alert_manager().await;
        test.chain.set_height(100);
        test.chain.set_name_info("ocer", fixtures::no_auction());
        let alert = test.manager.create_name_alert(7, "ocer").await.unwrap();
        assert!(alert.triggers.is_empty());

        // The auction opens in this block.
        test.chain.set_name_info("ocer", fixtures::ocer());
        let report = test
            .manager
            .on_new_block(fixtures::OCER_OPENED_AT, &[NameAction::open(fixtures::OCER_HASH, "ocer")])
            .await
            .unwrap();

        assert_eq!(report.reconcile.alerts_updated, 1);
        assert_eq!(report.name_alerts_sent, 1);
        assert_eq!(report.triggers_fired, 0);

        let sent = test.drain_notifications();
        assert!(matches!(
            &sent[..],
            [Notification::NameAlert { name_actions, block_height_triggers, .. }]
                if name_actions.len() == 1 && block_height_triggers.is_empty()
        ));

        let pending = test.manager.get_name_alert_detail(7, "ocer").await.unwrap().unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].milestone, MilestoneKind::AuctionBidding);
    }

    #[tokio::test]
    async fn test_undrained_receiver_does_not_stall_block_processing() {
        let repository = crate::persistence::SqliteStateRepository::new("sqlite::memory:")
            .await
            .unwrap();
        repository.run_migrations().await.unwrap();
        let repository = Arc::new(repository);
        let chain = Arc::new(crate::test_helpers::StaticChainQuery::new());
        let (tx, _rx) = mpsc::channel(1);
        let manager =
            AlertManager::new(Arc::clone(&repository), chain, NameParams::MAINNET, tx);

        for height in [10, 20] {
            manager.create_block_height_alert(7, height, "REMIND", None, false).await.unwrap();
        }

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            manager.on_new_block(30, &[]),
        )
        .await
        .expect("on_new_block stalled on a full channel")
        .unwrap();

        assert_eq!(report.block_height_alerts_fired, 2);
        assert!(manager.get_block_height_alerts(7).await.unwrap().is_empty());
        assert!(repository.get_due_block_height_alerts(30).await.unwrap().is_empty());
    }
}
