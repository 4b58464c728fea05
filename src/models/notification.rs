//! Messages emitted by the alert engine to the notification sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{alert::BlockHeightTrigger, name_action::NameAction};

/// A notification for the bot layer to render and deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Activity or a reached milestone on a watched name, one per chat and
    /// name per block.
    NameAlert {
        /// Destination chat.
        chat_id: i64,
        /// The watched name.
        target_name: String,
        /// Name actions on the watched name in this block.
        name_actions: Vec<NameAction>,
        /// Milestone triggers that became due.
        block_height_triggers: Vec<BlockHeightTrigger>,
    },
    /// A standalone block height alert became due.
    BlockHeightAlert {
        /// Destination chat.
        chat_id: i64,
        /// The height the alert was set for.
        block_height: u64,
        /// Alert type.
        alert_type: String,
        /// Context stored with the alert, `null` if absent or unreadable.
        context: Value,
    },
}

impl Notification {
    /// The chat this notification is addressed to.
    pub fn chat_id(&self) -> i64 {
        match self {
            Notification::NameAlert { chat_id, .. } => *chat_id,
            Notification::BlockHeightAlert { chat_id, .. } => *chat_id,
        }
    }
}
