//! Persisted alert subscriptions and their scheduled triggers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::milestone::{Milestone, MilestoneKind};

/// A subscription of one chat to the lifecycle of one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAlert {
    /// Database id.
    pub id: i64,
    /// The subscribing chat.
    pub chat_id: i64,
    /// The watched name, already encoded.
    pub target_name: String,
    /// Triggers belonging to this alert, fired or not.
    pub triggers: Vec<BlockHeightTrigger>,
}

impl NameAlert {
    /// Triggers that have not fired yet.
    pub fn pending_triggers(&self) -> impl Iterator<Item = &BlockHeightTrigger> {
        self.triggers.iter().filter(|t| !t.did_fire)
    }
}

/// A one-shot notification scheduled at the height of a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeightTrigger {
    /// Database id.
    pub id: i64,
    /// Owning name alert.
    pub alert_id: i64,
    /// Height at which the trigger is due.
    pub block_height: u64,
    /// The milestone this trigger announces.
    pub milestone: MilestoneKind,
    /// Set once the trigger has been delivered. Never reset.
    pub did_fire: bool,
}

impl BlockHeightTrigger {
    /// The milestone this trigger was scheduled for.
    pub fn as_milestone(&self) -> Milestone {
        Milestone::new(self.milestone, self.block_height)
    }
}

/// A due trigger together with the subscription it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTrigger {
    /// The subscribing chat.
    pub chat_id: i64,
    /// The watched name.
    pub target_name: String,
    /// The trigger itself.
    pub trigger: BlockHeightTrigger,
}

/// A standalone alert that fires once a block height is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeightAlert {
    /// Database id.
    pub id: i64,
    /// The subscribing chat.
    pub chat_id: i64,
    /// Height at which the alert is due.
    pub block_height: u64,
    /// Free-form alert type, interpreted by the bot layer.
    pub alert_type: String,
    /// Set once the alert has been delivered.
    pub did_fire: bool,
    /// Opaque context stored with the alert.
    pub context: Option<Value>,
}

/// Input for creating a [`BlockHeightAlert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlockHeightAlert {
    /// The subscribing chat.
    pub chat_id: i64,
    /// Height at which the alert is due.
    pub block_height: u64,
    /// Free-form alert type.
    pub alert_type: String,
    /// Opaque context to store with the alert.
    pub context: Option<Value>,
}

/// What a chat sees when listing its block height alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeightAlertSummary {
    /// Height at which the alert is due.
    pub block_height: u64,
    /// Alert type.
    pub alert_type: String,
}

impl From<&BlockHeightAlert> for BlockHeightAlertSummary {
    fn from(alert: &BlockHeightAlert) -> Self {
        Self { block_height: alert.block_height, alert_type: alert.alert_type.clone() }
    }
}
