//! Data models shared by the alert engine, the store and the chain query seam.

pub mod alert;
pub mod block;
pub mod milestone;
pub mod name;
pub mod name_action;
pub mod name_info;
pub mod notification;

pub use alert::{
    BlockHeightAlert, BlockHeightAlertSummary, BlockHeightTrigger, DueTrigger, NameAlert,
    NewBlockHeightAlert,
};
pub use block::{NewBlockEvent, RawBlock, RawCovenant, RawTransaction, TxOutput};
pub use milestone::{Milestone, MilestoneKind};
pub use name_action::{ActionDetails, NameAction, NameActionKind};
pub use name_info::{NameInfo, NameState};
pub use notification::Notification;
