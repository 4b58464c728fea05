//! The alert engine: milestone scheduling, trigger reconciliation and firing.

pub mod alert_manager;
pub mod block_watcher;
pub mod firing;
pub mod milestones;
pub mod reconciler;
