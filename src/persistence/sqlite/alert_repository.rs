//! Implementation of the AlertRepository trait for SqliteStateRepository

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use super::{from_db_height, to_db_height};
use crate::{
    models::{
        alert::{BlockHeightAlert, BlockHeightTrigger, DueTrigger, NameAlert, NewBlockHeightAlert},
        milestone::{Milestone, MilestoneKind},
    },
    persistence::{error::PersistenceError, sqlite::SqliteStateRepository, traits::AlertRepository},
};

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct NameAlertRow {
    id: i64,
    chat_id: i64,
    target_name: String,
}

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct TriggerRow {
    id: i64,
    alert_id: i64,
    block_height: i64,
    milestone: String,
    did_fire: bool,
}

impl TryFrom<TriggerRow> for BlockHeightTrigger {
    type Error = PersistenceError;

    fn try_from(row: TriggerRow) -> Result<Self, Self::Error> {
        let milestone = row.milestone.parse::<MilestoneKind>().map_err(|e| {
            tracing::error!(error = %e, trigger_id = row.id, "Stored trigger has an unknown milestone.");
            PersistenceError::SerializationError(e.to_string())
        })?;
        Ok(BlockHeightTrigger {
            id: row.id,
            alert_id: row.alert_id,
            block_height: from_db_height(row.block_height)?,
            milestone,
            did_fire: row.did_fire,
        })
    }
}

// Helper struct for mapping a trigger joined with its alert
#[derive(sqlx::FromRow)]
struct DueTriggerRow {
    chat_id: i64,
    target_name: String,
    #[sqlx(flatten)]
    trigger: TriggerRow,
}

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct BlockHeightAlertRow {
    id: i64,
    chat_id: i64,
    block_height: i64,
    alert_type: String,
    did_fire: bool,
    context: Option<String>,
}

impl TryFrom<BlockHeightAlertRow> for BlockHeightAlert {
    type Error = PersistenceError;

    fn try_from(row: BlockHeightAlertRow) -> Result<Self, Self::Error> {
        // Unreadable context is delivered as absent rather than failing the alert.
        let context = row.context.as_deref().and_then(|raw| {
            serde_json::from_str(raw)
                .inspect_err(|e| {
                    tracing::warn!(error = %e, alert_id = row.id, "Ignoring unreadable alert context.");
                })
                .ok()
        });
        Ok(BlockHeightAlert {
            id: row.id,
            chat_id: row.chat_id,
            block_height: from_db_height(row.block_height)?,
            alert_type: row.alert_type,
            did_fire: row.did_fire,
            context,
        })
    }
}

const TRIGGER_COLUMNS: &str = "t.id, t.alert_id, t.block_height, t.milestone, t.did_fire";

/// Inserts one unfired trigger per milestone on the given connection.
async fn insert_triggers(
    conn: &mut SqliteConnection,
    alert_id: i64,
    milestones: &[Milestone],
) -> Result<(), PersistenceError> {
    for milestone in milestones {
        let block_height = to_db_height(milestone.block_height)?;
        sqlx::query(
            "INSERT INTO name_alert_triggers (alert_id, block_height, milestone, did_fire) \
             VALUES (?, ?, ?, 0)",
        )
        .bind(alert_id)
        .bind(block_height)
        .bind(milestone.kind.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, alert_id, "Failed to insert trigger.");
            PersistenceError::OperationFailed(e.to_string())
        })?;
    }
    Ok(())
}

fn into_triggers(rows: Vec<TriggerRow>) -> Result<Vec<BlockHeightTrigger>, PersistenceError> {
    rows.into_iter().map(BlockHeightTrigger::try_from).collect()
}

fn tx_error(operation: &'static str) -> impl Fn(sqlx::Error) -> PersistenceError {
    move |e| {
        tracing::error!(error = %e, operation, "Database transaction failed.");
        PersistenceError::OperationFailed(e.to_string())
    }
}

impl SqliteStateRepository {
    async fn get_triggers_for_alert(
        &self,
        alert_id: i64,
    ) -> Result<Vec<BlockHeightTrigger>, PersistenceError> {
        let rows: Vec<TriggerRow> = self
            .execute_query_with_error_handling(
                "query triggers for alert",
                sqlx::query_as(&format!(
                    "SELECT {TRIGGER_COLUMNS} FROM name_alert_triggers t \
                     WHERE t.alert_id = ? ORDER BY t.block_height, t.id"
                ))
                .bind(alert_id)
                .fetch_all(&self.pool),
            )
            .await?;
        into_triggers(rows)
    }
}

#[async_trait]
impl AlertRepository for SqliteStateRepository {
    #[tracing::instrument(skip(self, milestones), level = "debug")]
    async fn create_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
        milestones: &[Milestone],
    ) -> Result<NameAlert, PersistenceError> {
        if target_name.is_empty() {
            return Err(PersistenceError::InvalidInput("target name is required".into()));
        }
        tracing::debug!(chat_id, target_name, triggers = milestones.len(), "Creating name alert.");

        let mut tx = self.pool.begin().await.map_err(tx_error("begin create name alert"))?;

        let alert_id: i64 = sqlx::query_scalar(
            "INSERT INTO name_alerts (chat_id, target_name) VALUES (?, ?) RETURNING id",
        )
        .bind(chat_id)
        .bind(target_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(tx_error("insert name alert"))?;

        insert_triggers(&mut tx, alert_id, milestones).await?;

        let rows: Vec<TriggerRow> = sqlx::query_as(&format!(
            "SELECT {TRIGGER_COLUMNS} FROM name_alert_triggers t \
             WHERE t.alert_id = ? ORDER BY t.block_height, t.id"
        ))
        .bind(alert_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(tx_error("query created triggers"))?;

        tx.commit().await.map_err(tx_error("commit create name alert"))?;

        tracing::info!(chat_id, target_name, alert_id, "Name alert created.");
        Ok(NameAlert {
            id: alert_id,
            chat_id,
            target_name: target_name.to_string(),
            triggers: into_triggers(rows)?,
        })
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn name_alert_exists(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<bool, PersistenceError> {
        let count: i64 = self
            .execute_query_with_error_handling(
                "count name alerts",
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM name_alerts WHERE chat_id = ? AND target_name = ?",
                )
                .bind(chat_id)
                .bind(target_name)
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(count > 0)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<u64, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(tx_error("begin delete name alert"))?;

        sqlx::query(
            "DELETE FROM name_alert_triggers WHERE alert_id IN \
             (SELECT id FROM name_alerts WHERE chat_id = ? AND target_name = ?)",
        )
        .bind(chat_id)
        .bind(target_name)
        .execute(&mut *tx)
        .await
        .map_err(tx_error("delete name alert triggers"))?;

        let removed = sqlx::query("DELETE FROM name_alerts WHERE chat_id = ? AND target_name = ?")
            .bind(chat_id)
            .bind(target_name)
            .execute(&mut *tx)
            .await
            .map_err(tx_error("delete name alerts"))?
            .rows_affected();

        tx.commit().await.map_err(tx_error("commit delete name alert"))?;

        if removed > 0 {
            tracing::info!(chat_id, target_name, removed, "Name alert deleted.");
        } else {
            tracing::debug!(chat_id, target_name, "No name alert to delete.");
        }
        Ok(removed)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_name_alert_names(&self, chat_id: i64) -> Result<Vec<String>, PersistenceError> {
        self.execute_query_with_error_handling(
            "query name alert names",
            sqlx::query_scalar("SELECT target_name FROM name_alerts WHERE chat_id = ? ORDER BY id")
                .bind(chat_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_name_alert(
        &self,
        chat_id: i64,
        target_name: &str,
    ) -> Result<Option<NameAlert>, PersistenceError> {
        let row: Option<NameAlertRow> = self
            .execute_query_with_error_handling(
                "query name alert",
                sqlx::query_as(
                    "SELECT id, chat_id, target_name FROM name_alerts \
                     WHERE chat_id = ? AND target_name = ? ORDER BY id LIMIT 1",
                )
                .bind(chat_id)
                .bind(target_name)
                .fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            tracing::debug!(chat_id, target_name, "Name alert not found.");
            return Ok(None);
        };

        let triggers = self.get_triggers_for_alert(row.id).await?;
        Ok(Some(NameAlert {
            id: row.id,
            chat_id: row.chat_id,
            target_name: row.target_name,
            triggers,
        }))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_pending_triggers(
        &self,
        alert_id: i64,
    ) -> Result<Vec<BlockHeightTrigger>, PersistenceError> {
        let rows: Vec<TriggerRow> = self
            .execute_query_with_error_handling(
                "query pending triggers",
                sqlx::query_as(&format!(
                    "SELECT {TRIGGER_COLUMNS} FROM name_alert_triggers t \
                     WHERE t.alert_id = ? AND t.did_fire = 0 ORDER BY t.block_height ASC, t.id"
                ))
                .bind(alert_id)
                .fetch_all(&self.pool),
            )
            .await?;
        into_triggers(rows)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_distinct_target_names(&self) -> Result<Vec<String>, PersistenceError> {
        self.execute_query_with_error_handling(
            "query distinct target names",
            sqlx::query_scalar("SELECT DISTINCT target_name FROM name_alerts ORDER BY target_name")
                .fetch_all(&self.pool),
        )
        .await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_name_alerts_for_target(
        &self,
        target_name: &str,
    ) -> Result<Vec<NameAlert>, PersistenceError> {
        let alert_rows: Vec<NameAlertRow> = self
            .execute_query_with_error_handling(
                "query name alerts for target",
                sqlx::query_as(
                    "SELECT id, chat_id, target_name FROM name_alerts \
                     WHERE target_name = ? ORDER BY id",
                )
                .bind(target_name)
                .fetch_all(&self.pool),
            )
            .await?;

        let trigger_rows: Vec<TriggerRow> = self
            .execute_query_with_error_handling(
                "query triggers for target",
                sqlx::query_as(&format!(
                    "SELECT {TRIGGER_COLUMNS} FROM name_alert_triggers t \
                     JOIN name_alerts a ON a.id = t.alert_id \
                     WHERE a.target_name = ? ORDER BY t.alert_id, t.block_height, t.id"
                ))
                .bind(target_name)
                .fetch_all(&self.pool),
            )
            .await?;

        let mut triggers_by_alert: BTreeMap<i64, Vec<BlockHeightTrigger>> = BTreeMap::new();
        for trigger in into_triggers(trigger_rows)? {
            triggers_by_alert.entry(trigger.alert_id).or_default().push(trigger);
        }

        Ok(alert_rows
            .into_iter()
            .map(|row| NameAlert {
                triggers: triggers_by_alert.remove(&row.id).unwrap_or_default(),
                id: row.id,
                chat_id: row.chat_id,
                target_name: row.target_name,
            })
            .collect())
    }

    #[tracing::instrument(skip(self, milestones), level = "debug")]
    async fn replace_future_triggers(
        &self,
        alert_id: i64,
        block_height: u64,
        milestones: &[Milestone],
    ) -> Result<(), PersistenceError> {
        let height = to_db_height(block_height)?;
        let mut tx = self.pool.begin().await.map_err(tx_error("begin replace triggers"))?;

        let removed = sqlx::query(
            "DELETE FROM name_alert_triggers \
             WHERE alert_id = ? AND did_fire = 0 AND block_height > ?",
        )
        .bind(alert_id)
        .bind(height)
        .execute(&mut *tx)
        .await
        .map_err(tx_error("delete future triggers"))?
        .rows_affected();

        insert_triggers(&mut tx, alert_id, milestones).await?;

        tx.commit().await.map_err(tx_error("commit replace triggers"))?;

        tracing::debug!(
            alert_id,
            block_height,
            removed,
            inserted = milestones.len(),
            "Future triggers replaced."
        );
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_due_triggers(
        &self,
        block_height: u64,
    ) -> Result<Vec<DueTrigger>, PersistenceError> {
        let height = to_db_height(block_height)?;
        let rows: Vec<DueTriggerRow> = self
            .execute_query_with_error_handling(
                "query due triggers",
                sqlx::query_as(&format!(
                    "SELECT a.chat_id, a.target_name, {TRIGGER_COLUMNS} \
                     FROM name_alert_triggers t JOIN name_alerts a ON a.id = t.alert_id \
                     WHERE t.did_fire = 0 AND t.block_height <= ? \
                     ORDER BY a.chat_id, a.target_name, t.block_height, t.id"
                ))
                .bind(height)
                .fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DueTrigger {
                    chat_id: row.chat_id,
                    target_name: row.target_name,
                    trigger: row.trigger.try_into()?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn mark_triggers_fired(&self, trigger_ids: &[i64]) -> Result<(), PersistenceError> {
        if trigger_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(tx_error("begin mark triggers fired"))?;
        for id in trigger_ids {
            sqlx::query("UPDATE name_alert_triggers SET did_fire = 1 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(tx_error("mark trigger fired"))?;
        }
        tx.commit().await.map_err(tx_error("commit mark triggers fired"))?;

        tracing::debug!(count = trigger_ids.len(), "Triggers marked as fired.");
        Ok(())
    }

    #[tracing::instrument(skip(self, alert), fields(chat_id = alert.chat_id, block_height = alert.block_height), level = "debug")]
    async fn create_block_height_alert(
        &self,
        alert: &NewBlockHeightAlert,
        enforce_unique: bool,
    ) -> Result<bool, PersistenceError> {
        if alert.alert_type.is_empty() {
            return Err(PersistenceError::InvalidInput("alert type is required".into()));
        }
        let height = to_db_height(alert.block_height)?;
        let context = alert
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(tx_error("begin create block height alert"))?;

        if enforce_unique {
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM block_height_alerts \
                 WHERE chat_id = ? AND block_height = ? AND alert_type = ? AND did_fire = 0",
            )
            .bind(alert.chat_id)
            .bind(height)
            .bind(&alert.alert_type)
            .fetch_one(&mut *tx)
            .await
            .map_err(tx_error("count block height alerts"))?;

            if existing > 0 {
                tracing::debug!(alert_type = %alert.alert_type, "Matching block height alert exists, skipping.");
                return Ok(false);
            }
        }

        sqlx::query(
            "INSERT INTO block_height_alerts (chat_id, block_height, alert_type, did_fire, context) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(alert.chat_id)
        .bind(height)
        .bind(&alert.alert_type)
        .bind(context)
        .execute(&mut *tx)
        .await
        .map_err(tx_error("insert block height alert"))?;

        tx.commit().await.map_err(tx_error("commit create block height alert"))?;

        tracing::info!(alert_type = %alert.alert_type, "Block height alert created.");
        Ok(true)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete_block_height_alert(
        &self,
        chat_id: i64,
        block_height: u64,
        alert_type: &str,
    ) -> Result<u64, PersistenceError> {
        let height = to_db_height(block_height)?;
        let result = self
            .execute_query_with_error_handling(
                "delete block height alert",
                sqlx::query(
                    "DELETE FROM block_height_alerts \
                     WHERE chat_id = ? AND block_height = ? AND alert_type = ? AND did_fire = 0",
                )
                .bind(chat_id)
                .bind(height)
                .bind(alert_type)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_block_height_alerts(
        &self,
        chat_id: i64,
    ) -> Result<Vec<BlockHeightAlert>, PersistenceError> {
        let rows: Vec<BlockHeightAlertRow> = self
            .execute_query_with_error_handling(
                "query block height alerts",
                sqlx::query_as(
                    "SELECT id, chat_id, block_height, alert_type, did_fire, context \
                     FROM block_height_alerts WHERE chat_id = ? AND did_fire = 0 \
                     ORDER BY block_height ASC, id",
                )
                .bind(chat_id)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(BlockHeightAlert::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_due_block_height_alerts(
        &self,
        block_height: u64,
    ) -> Result<Vec<BlockHeightAlert>, PersistenceError> {
        let height = to_db_height(block_height)?;
        let rows: Vec<BlockHeightAlertRow> = self
            .execute_query_with_error_handling(
                "query due block height alerts",
                sqlx::query_as(
                    "SELECT id, chat_id, block_height, alert_type, did_fire, context \
                     FROM block_height_alerts WHERE did_fire = 0 AND block_height <= ? \
                     ORDER BY block_height, id",
                )
                .bind(height)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(BlockHeightAlert::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn mark_block_height_alert_fired(&self, id: i64) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "mark block height alert fired",
            sqlx::query("UPDATE block_height_alerts SET did_fire = 1 WHERE id = ?")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_last_processed_block(&self) -> Result<Option<u64>, PersistenceError> {
        let height: Option<i64> = self
            .execute_query_with_error_handling(
                "query last processed block",
                sqlx::query_scalar("SELECT MAX(block_height) FROM processed_blocks")
                    .fetch_one(&self.pool),
            )
            .await?;

        match height {
            Some(height) => {
                let height = from_db_height(height)?;
                tracing::debug!(block_height = height, "Last processed block found.");
                Ok(Some(height))
            }
            None => {
                tracing::debug!("No last processed block found.");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn record_processed_block(
        &self,
        block_height: u64,
        block_hash: &str,
    ) -> Result<(), PersistenceError> {
        let height = to_db_height(block_height)?;
        self.execute_query_with_error_handling(
            "record processed block",
            sqlx::query(
                "INSERT OR REPLACE INTO processed_blocks (block_height, block_hash) VALUES (?, ?)",
            )
            .bind(height)
            .bind(block_hash)
            .execute(&self.pool),
        )
        .await?;
        tracing::debug!(block_height, block_hash, "Processed block recorded.");
        Ok(())
    }
}
