//! Decides which alerts fire on a block and hands their notifications to the
//! sink.
//!
//! Due items are marked fired once their notification has been handed off,
//! whether or not the receiver took it. A full or closed channel never holds
//! up block processing. An alert is delivered at most once.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    models::{alert::BlockHeightTrigger, name_action::NameAction, notification::Notification},
    persistence::{error::PersistenceError, traits::AlertRepository},
};

/// Outcome of one firing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiringReport {
    /// Notifications handed to the sink.
    pub notifications_sent: usize,
    /// Stored items marked as fired.
    pub items_fired: usize,
}

#[derive(Debug, Default)]
struct NameAlertGroup {
    name_actions: Vec<NameAction>,
    block_height_triggers: Vec<BlockHeightTrigger>,
}

/// Hands a notification to the sink without waiting for capacity. Returns
/// whether the channel accepted it.
fn send(sink: &mpsc::Sender<Notification>, notification: Notification) -> bool {
    let chat_id = notification.chat_id();
    match sink.try_send(notification) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(chat_id, "Notification channel full, dropping notification.");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::warn!(chat_id, "Notification channel closed, dropping notification.");
            false
        }
    }
}

/// Fires the name alerts matched by this block's actions and by their due
/// block height triggers.
///
/// Sends exactly one notification per `(chat_id, target_name)`, in that
/// order, then marks every due trigger as fired.
#[tracing::instrument(skip(repository, name_actions, sink), level = "debug")]
pub async fn fire_name_alerts<R>(
    repository: &R,
    name_actions: &[NameAction],
    block_height: u64,
    sink: &mpsc::Sender<Notification>,
) -> Result<FiringReport, PersistenceError>
where
    R: AlertRepository + ?Sized,
{
    let mut groups: BTreeMap<(i64, String), NameAlertGroup> = BTreeMap::new();

    if !name_actions.is_empty() {
        let watched: HashSet<String> =
            repository.get_distinct_target_names().await?.into_iter().collect();

        let mut actions_by_name: BTreeMap<&str, Vec<NameAction>> = BTreeMap::new();
        for action in name_actions {
            if let Some(name) = action.name().filter(|name| watched.contains(*name)) {
                actions_by_name.entry(name).or_default().push(action.clone());
            }
        }

        for (name, actions) in actions_by_name {
            for alert in repository.get_name_alerts_for_target(name).await? {
                groups.entry((alert.chat_id, alert.target_name)).or_default().name_actions =
                    actions.clone();
            }
        }
    }

    let due = repository.get_due_triggers(block_height).await?;
    let due_ids: Vec<i64> = due.iter().map(|d| d.trigger.id).collect();
    for item in due {
        groups
            .entry((item.chat_id, item.target_name))
            .or_default()
            .block_height_triggers
            .push(item.trigger);
    }

    let mut report = FiringReport::default();
    for ((chat_id, target_name), group) in groups {
        tracing::debug!(
            chat_id,
            target_name = %target_name,
            actions = group.name_actions.len(),
            triggers = group.block_height_triggers.len(),
            "Firing name alert."
        );
        let notification = Notification::NameAlert {
            chat_id,
            target_name,
            name_actions: group.name_actions,
            block_height_triggers: group.block_height_triggers,
        };
        if send(sink, notification) {
            report.notifications_sent += 1;
        }
    }

    repository.mark_triggers_fired(&due_ids).await?;
    report.items_fired = due_ids.len();

    if report.items_fired > 0 || report.notifications_sent > 0 {
        tracing::info!(
            block_height,
            notifications = report.notifications_sent,
            triggers_fired = report.items_fired,
            "Name alerts fired."
        );
    }
    Ok(report)
}

/// Fires every due standalone block height alert, one notification each, in
/// height order.
#[tracing::instrument(skip(repository, sink), level = "debug")]
pub async fn fire_block_height_alerts<R>(
    repository: &R,
    block_height: u64,
    sink: &mpsc::Sender<Notification>,
) -> Result<FiringReport, PersistenceError>
where
    R: AlertRepository + ?Sized,
{
    let mut report = FiringReport::default();

    for alert in repository.get_due_block_height_alerts(block_height).await? {
        let id = alert.id;
        let notification = Notification::BlockHeightAlert {
            chat_id: alert.chat_id,
            block_height: alert.block_height,
            alert_type: alert.alert_type,
            context: alert.context.unwrap_or(Value::Null),
        };
        if send(sink, notification) {
            report.notifications_sent += 1;
        }
        repository.mark_block_height_alert_fired(id).await?;
        report.items_fired += 1;
    }

    if report.items_fired > 0 {
        tracing::info!(block_height, fired = report.items_fired, "Block height alerts fired.");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        models::{
            alert::{BlockHeightAlert, DueTrigger, NameAlert},
            milestone::MilestoneKind,
        },
        persistence::traits::MockAlertRepository,
    };

    fn trigger(id: i64, alert_id: i64, block_height: u64, milestone: MilestoneKind) -> BlockHeightTrigger {
        BlockHeightTrigger { id, alert_id, block_height, milestone, did_fire: false }
    }

    fn due(chat_id: i64, target_name: &str, trigger: BlockHeightTrigger) -> DueTrigger {
        DueTrigger { chat_id, target_name: target_name.into(), trigger }
    }

    fn alert(id: i64, chat_id: i64, target_name: &str) -> NameAlert {
        NameAlert { id, chat_id, target_name: target_name.into(), triggers: Vec::new() }
    }

    #[tokio::test]
    async fn test_merges_actions_and_triggers_per_chat_and_name() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names()
            .returning(|| Ok(vec!["ocer".into(), "moviebox".into()]));
        repo.expect_get_name_alerts_for_target().returning(|name| match name {
            "ocer" => Ok(vec![alert(1, 10, "ocer"), alert(2, 20, "ocer")]),
            _ => Ok(vec![]),
        });
        repo.expect_get_due_triggers().returning(|_| {
            Ok(vec![
                due(10, "ocer", trigger(100, 1, 62554, MilestoneKind::AuctionBidding)),
                due(30, "moviebox", trigger(200, 3, 62554, MilestoneKind::AuctionReveal)),
            ])
        });
        repo.expect_mark_triggers_fired()
            .withf(|ids| ids == [100, 200])
            .times(1)
            .returning(|_| Ok(()));

        let (tx, mut rx) = mpsc::channel(10);
        let actions = [NameAction::bid("h", "ocer", 2.0), NameAction::bid("x", "unwatched", 1.0)];
        let report = fire_name_alerts(&repo, &actions, 62554, &tx).await.unwrap();

        assert_eq!(report, FiringReport { notifications_sent: 3, items_fired: 2 });

        let mut sent = Vec::new();
        while let Ok(n) = rx.try_recv() {
            sent.push(n);
        }
        let keys: Vec<_> = sent
            .iter()
            .map(|n| match n {
                Notification::NameAlert { chat_id, target_name, name_actions, block_height_triggers } => {
                    (*chat_id, target_name.as_str(), name_actions.len(), block_height_triggers.len())
                }
                other => panic!("unexpected notification {other:?}"),
            })
            .collect();
        assert_eq!(keys, vec![(10, "ocer", 1, 1), (20, "ocer", 1, 0), (30, "moviebox", 0, 1)]);
    }

    #[tokio::test]
    async fn test_nothing_due_sends_nothing() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names().times(0);
        repo.expect_get_due_triggers().returning(|_| Ok(vec![]));
        repo.expect_mark_triggers_fired().returning(|_| Ok(()));

        let (tx, mut rx) = mpsc::channel(10);
        let report = fire_name_alerts(&repo, &[], 100, &tx).await.unwrap();

        assert_eq!(report, FiringReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_channel_still_marks_fired() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_due_triggers().returning(|_| {
            Ok(vec![due(10, "ocer", trigger(100, 1, 50, MilestoneKind::AuctionOpening))])
        });
        repo.expect_mark_triggers_fired().times(1).returning(|_| Ok(()));

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let report = fire_name_alerts(&repo, &[], 100, &tx).await.unwrap();

        assert_eq!(report, FiringReport { notifications_sent: 0, items_fired: 1 });
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block_firing() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_due_block_height_alerts().returning(|_| {
            Ok([10, 20]
                .into_iter()
                .enumerate()
                .map(|(i, block_height)| BlockHeightAlert {
                    id: i as i64 + 1,
                    chat_id: 10,
                    block_height,
                    alert_type: "REMIND".into(),
                    did_fire: false,
                    context: None,
                })
                .collect())
        });
        repo.expect_mark_block_height_alert_fired().times(2).returning(|_| Ok(()));

        let (tx, _rx) = mpsc::channel(1);
        let report = fire_block_height_alerts(&repo, 30, &tx).await.unwrap();

        assert_eq!(report, FiringReport { notifications_sent: 1, items_fired: 2 });
    }

    #[tokio::test]
    async fn test_block_height_alerts_fire_individually() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_due_block_height_alerts().returning(|_| {
            Ok(vec![
                BlockHeightAlert {
                    id: 1,
                    chat_id: 10,
                    block_height: 90,
                    alert_type: "REMIND".into(),
                    did_fire: false,
                    context: Some(json!({"name": "ocer"})),
                },
                BlockHeightAlert {
                    id: 2,
                    chat_id: 10,
                    block_height: 100,
                    alert_type: "REMIND".into(),
                    did_fire: false,
                    context: None,
                },
            ])
        });
        let mut seq = mockall::Sequence::new();
        for id in [1, 2] {
            repo.expect_mark_block_height_alert_fired()
                .withf(move |fired| *fired == id)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let (tx, mut rx) = mpsc::channel(10);
        let report = fire_block_height_alerts(&repo, 100, &tx).await.unwrap();
        assert_eq!(report, FiringReport { notifications_sent: 2, items_fired: 2 });

        let first = rx.try_recv().unwrap();
        assert_eq!(
            first,
            Notification::BlockHeightAlert {
                chat_id: 10,
                block_height: 90,
                alert_type: "REMIND".into(),
                context: json!({"name": "ocer"}),
            }
        );
        let second = rx.try_recv().unwrap();
        assert!(matches!(second, Notification::BlockHeightAlert { context: Value::Null, .. }));
    }
}
