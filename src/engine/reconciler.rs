//! Keeps scheduled triggers in line with on-chain activity.
//!
//! When a block carries an action that can move a watched name's schedule,
//! the name's future, unfired triggers are recomputed from a fresh snapshot.

use std::collections::HashSet;

use futures::future::join_all;

use crate::{
    config::NameParams,
    engine::milestones::calculate_all_future_milestones,
    models::name_action::{NameAction, NameActionKind},
    persistence::{error::PersistenceError, traits::AlertRepository},
    providers::traits::ChainQuery,
};

/// Actions that can change the future milestones of a name.
///
/// `RENEW` is not among them: a renewal moves the expiry, but alerts created
/// before it keep their original expiry trigger.
pub const SCHEDULE_AFFECTING_ACTIONS: [NameActionKind; 6] = [
    NameActionKind::Claim,
    NameActionKind::Open,
    NameActionKind::Register,
    NameActionKind::Transfer,
    NameActionKind::Finalize,
    NameActionKind::Revoke,
];

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Names whose alerts were rescheduled.
    pub names_reconciled: usize,
    /// Names skipped because their snapshot could not be fetched.
    pub names_failed: usize,
    /// Alerts whose triggers were replaced.
    pub alerts_updated: usize,
}

/// Names touched by schedule-affecting actions, deduplicated in first-seen
/// order, restricted to `watched`.
fn affected_names<'a>(name_actions: &'a [NameAction], watched: &HashSet<String>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    name_actions
        .iter()
        .filter(|action| SCHEDULE_AFFECTING_ACTIONS.contains(&action.kind()))
        .filter_map(NameAction::name)
        .filter(|name| watched.contains(*name))
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Replaces the future triggers of every alert on a name touched by a
/// schedule-affecting action in this block.
///
/// Snapshots are fetched concurrently. A failed fetch skips that name only.
/// Storage errors abort the pass.
#[tracing::instrument(skip(repository, chain, params, name_actions), fields(actions = name_actions.len()), level = "debug")]
pub async fn reconcile_triggers<R, C>(
    repository: &R,
    chain: &C,
    params: &NameParams,
    name_actions: &[NameAction],
    block_height: u64,
) -> Result<ReconcileReport, PersistenceError>
where
    R: AlertRepository + ?Sized,
    C: ChainQuery + ?Sized,
{
    let mut report = ReconcileReport::default();
    if name_actions.is_empty() {
        return Ok(report);
    }

    let watched: HashSet<String> = repository.get_distinct_target_names().await?.into_iter().collect();
    let names = affected_names(name_actions, &watched);
    if names.is_empty() {
        tracing::debug!(block_height, "No watched names affected by this block.");
        return Ok(report);
    }

    let snapshots =
        join_all(names.iter().map(|name| async move { (*name, chain.get_name_info(name).await) }))
            .await;

    for (name, snapshot) in snapshots {
        let name_info = match snapshot {
            Ok(name_info) => name_info,
            Err(e) => {
                tracing::warn!(error = %e, target_name = name, block_height, "Failed to fetch name info, skipping reconciliation.");
                report.names_failed += 1;
                continue;
            }
        };

        let milestones = calculate_all_future_milestones(&name_info, block_height, params);
        let alerts = repository.get_name_alerts_for_target(name).await?;
        for alert in &alerts {
            repository.replace_future_triggers(alert.id, block_height, &milestones).await?;
        }

        tracing::info!(
            target_name = name,
            block_height,
            alerts = alerts.len(),
            milestones = milestones.len(),
            "Rescheduled name alert triggers."
        );
        report.names_reconciled += 1;
        report.alerts_updated += alerts.len();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{alert::NameAlert, name_action::ActionDetails},
        persistence::traits::MockAlertRepository,
        providers::traits::{ChainQueryError, MockChainQuery},
        test_helpers::fixtures,
    };

    const PARAMS: NameParams = NameParams::MAINNET;

    fn alert(id: i64, chat_id: i64, target_name: &str) -> NameAlert {
        NameAlert { id, chat_id, target_name: target_name.into(), triggers: Vec::new() }
    }

    #[test]
    fn test_affected_names_filters_and_deduplicates() {
        let watched: HashSet<String> = ["ocer", "moviebox"].map(String::from).into();
        let actions = vec![
            NameAction::bid("h1", "moviebox", 1.0),
            NameAction::open("h2", "ocer"),
            NameAction::open("h3", "unwatched"),
            NameAction::new("h2", Some("ocer".into()), ActionDetails::Register { burned_value: 1.0 }),
            NameAction::new("h1", Some("moviebox".into()), ActionDetails::Renew),
            NameAction::new("h4", None, ActionDetails::Revoke),
            NameAction::new("h1", Some("moviebox".into()), ActionDetails::Transfer),
        ];

        assert_eq!(affected_names(&actions, &watched), vec!["ocer", "moviebox"]);
    }

    #[tokio::test]
    async fn test_reconcile_skips_when_nothing_is_watched() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names().returning(|| Ok(vec![]));
        repo.expect_get_name_alerts_for_target().times(0);
        let mut chain = MockChainQuery::new();
        chain.expect_get_name_info().times(0);

        let report =
            reconcile_triggers(&repo, &chain, &PARAMS, &[NameAction::open("h", "ocer")], 100)
                .await
                .unwrap();
        assert_eq!(report, ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_reconcile_replaces_triggers_of_every_alert() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names().returning(|| Ok(vec!["ocer".into()]));
        repo.expect_get_name_alerts_for_target()
            .withf(|name| name == "ocer")
            .returning(|_| Ok(vec![alert(1, 10, "ocer"), alert(2, 20, "ocer")]));
        repo.expect_replace_future_triggers()
            .withf(|_, height, milestones| {
                *height == 69583
                    && milestones.len() == 3
                    && milestones.iter().all(|m| m.block_height > 69583)
            })
            .times(2)
            .returning(|_, _, _| Ok(()));

        let mut chain = MockChainQuery::new();
        chain.expect_get_name_info().times(1).returning(|_| Ok(fixtures::opening()));

        let actions = [NameAction::open("h", "ocer"), NameAction::open("h", "ocer")];
        let report = reconcile_triggers(&repo, &chain, &PARAMS, &actions, 69583).await.unwrap();

        assert_eq!(report, ReconcileReport { names_reconciled: 1, names_failed: 0, alerts_updated: 2 });
    }

    #[tokio::test]
    async fn test_reconcile_isolates_name_info_failures() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names()
            .returning(|| Ok(vec!["broken".into(), "ocer".into()]));
        repo.expect_get_name_alerts_for_target()
            .withf(|name| name == "ocer")
            .returning(|_| Ok(vec![alert(1, 10, "ocer")]));
        repo.expect_replace_future_triggers().times(1).returning(|_, _, _| Ok(()));

        let mut chain = MockChainQuery::new();
        chain.expect_get_name_info().returning(|name| {
            if name == "broken" {
                Err(ChainQueryError::Upstream("timeout".into()))
            } else {
                Ok(fixtures::opening())
            }
        });

        let actions = [NameAction::open("h1", "broken"), NameAction::open("h2", "ocer")];
        let report = reconcile_triggers(&repo, &chain, &PARAMS, &actions, 69583).await.unwrap();

        assert_eq!(report, ReconcileReport { names_reconciled: 1, names_failed: 1, alerts_updated: 1 });
    }

    #[tokio::test]
    async fn test_reconcile_surfaces_storage_errors() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names()
            .returning(|| Err(PersistenceError::OperationFailed("db down".into())));
        let chain = MockChainQuery::new();

        let result =
            reconcile_triggers(&repo, &chain, &PARAMS, &[NameAction::open("h", "ocer")], 1).await;
        assert!(matches!(result, Err(PersistenceError::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_renew_does_not_reschedule() {
        let mut repo = MockAlertRepository::new();
        repo.expect_get_distinct_target_names().returning(|| Ok(vec!["ocer".into()]));
        repo.expect_replace_future_triggers().times(0);
        let mut chain = MockChainQuery::new();
        chain.expect_get_name_info().times(0);

        let renew = NameAction::new("h", Some("ocer".into()), ActionDetails::Renew);
        let report = reconcile_triggers(&repo, &chain, &PARAMS, &[renew], 1).await.unwrap();
        assert_eq!(report.names_reconciled, 0);
    }
}
