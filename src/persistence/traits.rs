//! The storage interface of the alert engine.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    models::{
        alert::{BlockHeightAlert, BlockHeightTrigger, DueTrigger, NameAlert, NewBlockHeightAlert},
        milestone::Milestone,
    },
    persistence::error::PersistenceError,
};

/// Durable storage for name alerts, their triggers, block height alerts and
/// block processing progress.
///
/// Every method that changes more than one row does so in a single
/// transaction.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertRepository: Send + Sync {
    // Name alerts:
    /// Creates a name alert with one unfired trigger per milestone.
    async fn create_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
        milestones: &[Milestone],
    ) -> Result<NameAlert, PersistenceError>;

    /// Whether the chat has an alert on the name.
    async fn name_alert_exists(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<bool, PersistenceError>;

    /// Deletes the chat's alerts on the name and their triggers. Returns the
    /// number of alerts removed.
    async fn delete_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<u64, PersistenceError>;

    /// Names the chat has alerts on.
    async fn get_name_alert_names(&self, chat_id: i64) -> Result<Vec<String>, PersistenceError>;

    /// The chat's alert on the name, with all of its triggers.
    async fn get_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<Option<NameAlert>, PersistenceError>;

    /// Unfired triggers of an alert, by ascending block height.
    async fn get_pending_triggers(
        &self,
        alert_id: i64,
    ) -> Result<Vec<BlockHeightTrigger>, PersistenceError>;

    /// Every name that at least one alert watches.
    async fn get_distinct_target_names(&self) -> Result<Vec<String>, PersistenceError>;

    /// All alerts on a name, with all of their triggers.
    async fn get_name_alerts_for_target(
        &self,
        target_name: &str,
    ) -> Result<Vec<NameAlert>, PersistenceError>;

    // Triggers:
    /// Deletes the alert's unfired triggers above `block_height` and
    /// schedules one trigger per milestone instead.
    async fn replace_future_triggers(
        &self,
        alert_id: i64,
        block_height: u64,
        milestones: &[Milestone],
    ) -> Result<(), PersistenceError>;

    /// Unfired triggers at or below `block_height`, with their alert's chat
    /// and name, ordered by chat, name, height and id.
    async fn get_due_triggers(&self, block_height: u64)
    -> Result<Vec<DueTrigger>, PersistenceError>;

    /// Marks the triggers as fired.
    async fn mark_triggers_fired(&self, trigger_ids: &[i64]) -> Result<(), PersistenceError>;

    // Block height alerts:
    /// Stores a block height alert. With `enforce_unique`, nothing is stored
    /// if the chat already has an unfired alert of the same type at the same
    /// height. Returns whether a row was stored.
    async fn create_block_height_alert(
        &self,
        alert: &NewBlockHeightAlert,
        enforce_unique: bool,
    ) -> Result<bool, PersistenceError>;

    /// Deletes matching unfired block height alerts. Returns the number of
    /// rows removed.
    async fn delete_block_height_alert(
        &self,
        chat_id: i64,
        block_height: u64,
        alert_type: &str,
    ) -> Result<u64, PersistenceError>;

    /// Unfired block height alerts of a chat, by ascending height.
    async fn get_block_height_alerts(
        &self,
        chat_id: i64,
    ) -> Result<Vec<BlockHeightAlert>, PersistenceError>;

    /// Unfired block height alerts at or below `block_height`, by height and
    /// id.
    async fn get_due_block_height_alerts(
        &self,
        block_height: u64,
    ) -> Result<Vec<BlockHeightAlert>, PersistenceError>;

    /// Marks a block height alert as fired.
    async fn mark_block_height_alert_fired(&self, id: i64) -> Result<(), PersistenceError>;

    // Block processing:
    /// Height of the highest fully processed block.
    async fn get_last_processed_block(&self) -> Result<Option<u64>, PersistenceError>;

    /// Records a block as fully processed.
    async fn record_processed_block(
        &self,
        block_height: u64,
        block_hash: &str,
    ) -> Result<(), PersistenceError>;
}
