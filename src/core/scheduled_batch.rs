//! Scheduled batch business logic.
//!
//! A batch is a list of debtors to email together at a set time. The caller-facing
//! functions schedule, list and cancel batches; the `pub(crate)` functions drive the
//! lifecycle from the batch sweep.

use crate::{
    config::database::MAX_ROWS_PER_STATEMENT,
    core::auth::RequestContext,
    entities::{
        BatchRecipient, BatchStatus, Debtor, ScheduledBatch, batch_recipient, debtor,
        scheduled_batch,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// A batch with the ids of the debtors it will email, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWithRecipients {
    /// The stored batch
    pub batch: scheduled_batch::Model,
    /// Recipient debtor ids ordered by position
    pub debtor_ids: Vec<i64>,
}

/// Loads recipients for the given batches, grouped by batch id and ordered by position.
async fn recipients_by_batch<C>(db: &C, batch_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();

    for chunk in batch_ids.chunks(MAX_ROWS_PER_STATEMENT) {
        let rows = BatchRecipient::find()
            .filter(batch_recipient::Column::BatchId.is_in(chunk.iter().copied()))
            .order_by_asc(batch_recipient::Column::BatchId)
            .order_by_asc(batch_recipient::Column::Position)
            .all(db)
            .await?;

        for row in rows {
            grouped.entry(row.batch_id).or_default().push(row.debtor_id);
        }
    }

    Ok(grouped)
}

/// Returns the first of `debtor_ids` that `owner` does not own, if any.
async fn first_unowned(
    db: &DatabaseConnection,
    owner: &str,
    debtor_ids: &[i64],
) -> Result<Option<i64>> {
    let mut owned = HashSet::with_capacity(debtor_ids.len());

    for chunk in debtor_ids.chunks(MAX_ROWS_PER_STATEMENT) {
        let ids: Vec<i64> = Debtor::find()
            .select_only()
            .column(debtor::Column::Id)
            .filter(debtor::Column::CreatedBy.eq(owner))
            .filter(debtor::Column::Id.is_in(chunk.iter().copied()))
            .into_tuple()
            .all(db)
            .await?;
        owned.extend(ids);
    }

    Ok(debtor_ids.iter().copied().find(|id| !owned.contains(id)))
}

async fn attach_recipients<C>(
    db: &C,
    batches: Vec<scheduled_batch::Model>,
) -> Result<Vec<BatchWithRecipients>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = batches.iter().map(|b| b.id).collect();
    let mut grouped = recipients_by_batch(db, &ids).await?;

    Ok(batches
        .into_iter()
        .map(|batch| BatchWithRecipients {
            debtor_ids: grouped.remove(&batch.id).unwrap_or_default(),
            batch,
        })
        .collect())
}

/// Schedules a reminder batch for the caller's debtors.
///
/// Every id must belong to the caller; one unknown or foreign id rejects the whole
/// request before anything is written. Repeated ids are kept once, at their first
/// position.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::Validation`] for an empty list,
/// [`Error::DebtorNotFound`] for the first id the caller does not own, or a database
/// error.
pub async fn schedule_batch(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_ids: &[i64],
    scheduled_for: DateTime<Utc>,
) -> Result<BatchWithRecipients> {
    let owner = ctx.require_user()?;

    let mut seen = HashSet::new();
    let unique: Vec<i64> = debtor_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if unique.is_empty() {
        return Err(Error::validation("A batch needs at least one debtor"));
    }

    if let Some(id) = first_unowned(db, owner, &unique).await? {
        return Err(Error::DebtorNotFound { id });
    }

    let txn = db.begin().await?;

    let batch = scheduled_batch::ActiveModel {
        scheduled_for: Set(scheduled_for),
        status: Set(BatchStatus::Pending),
        sent_count: Set(None),
        failed_count: Set(None),
        created_by: Set(owner.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let rows: Vec<batch_recipient::ActiveModel> = unique
        .iter()
        .zip(0_i32..)
        .map(|(&debtor_id, position)| batch_recipient::ActiveModel {
            batch_id: Set(batch.id),
            debtor_id: Set(debtor_id),
            position: Set(position),
            ..Default::default()
        })
        .collect();
    for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        BatchRecipient::insert_many(chunk.iter().cloned()).exec(&txn).await?;
    }
    txn.commit().await?;

    info!(
        batch_id = batch.id,
        recipients = unique.len(),
        scheduled_for = %batch.scheduled_for,
        "Batch scheduled"
    );
    Ok(BatchWithRecipients {
        batch,
        debtor_ids: unique,
    })
}

/// Lists the caller's batches, newest first, in every state.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] or a database error.
pub async fn list_scheduled(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<BatchWithRecipients>> {
    let owner = ctx.require_user()?;

    let batches = ScheduledBatch::find()
        .filter(scheduled_batch::Column::CreatedBy.eq(owner))
        .order_by_desc(scheduled_batch::Column::CreatedAt)
        .order_by_desc(scheduled_batch::Column::Id)
        .all(db)
        .await?;

    attach_recipients(db, batches).await
}

/// Cancels a pending batch owned by the caller, removing it and its recipients.
///
/// A pending batch whose time has already passed can still be cancelled as long as the
/// sweep has not picked it up.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::ScheduleNotFound`],
/// [`Error::InvalidState`] if the batch is not pending, or a database error.
pub async fn cancel_batch(db: &DatabaseConnection, ctx: &RequestContext, batch_id: i64) -> Result<()> {
    let owner = ctx.require_user()?;

    let txn = db.begin().await?;

    let batch = ScheduledBatch::find_by_id(batch_id)
        .one(&txn)
        .await?
        .filter(|b| b.created_by == owner)
        .ok_or(Error::ScheduleNotFound { id: batch_id })?;

    if batch.status != BatchStatus::Pending {
        return Err(Error::InvalidState {
            message: format!("Can only cancel pending batches (batch is {})", batch.status),
        });
    }

    BatchRecipient::delete_many()
        .filter(batch_recipient::Column::BatchId.eq(batch_id))
        .exec(&txn)
        .await?;
    ScheduledBatch::delete_by_id(batch_id).exec(&txn).await?;
    txn.commit().await?;

    info!(batch_id, "Batch cancelled");
    Ok(())
}

/// Pending batches scheduled strictly before `now`, with their recipients.
pub(crate) async fn get_pending_due(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<BatchWithRecipients>> {
    let batches = ScheduledBatch::find()
        .filter(scheduled_batch::Column::Status.eq(BatchStatus::Pending))
        .filter(scheduled_batch::Column::ScheduledFor.lt(now))
        .order_by_asc(scheduled_batch::Column::ScheduledFor)
        .order_by_asc(scheduled_batch::Column::Id)
        .all(db)
        .await?;

    attach_recipients(db, batches).await
}

/// Moves a batch from `pending` to `processing`.
///
/// Returns `false` when the batch was no longer pending, for example because a
/// concurrent sweep claimed it or it was cancelled.
pub(crate) async fn mark_processing(db: &DatabaseConnection, batch_id: i64) -> Result<bool> {
    let result = ScheduledBatch::update_many()
        .col_expr(
            scheduled_batch::Column::Status,
            Expr::value(BatchStatus::Processing.as_str()),
        )
        .filter(scheduled_batch::Column::Id.eq(batch_id))
        .filter(scheduled_batch::Column::Status.eq(BatchStatus::Pending))
        .exec(db)
        .await?;

    debug!(batch_id, claimed = result.rows_affected == 1, "Batch marked processing");
    Ok(result.rows_affected == 1)
}

/// Moves a batch from `processing` to `completed`, recording the outcome counts.
///
/// Returns `false` when the batch was not in `processing`, in which case nothing
/// changed.
pub(crate) async fn mark_completed(
    db: &DatabaseConnection,
    batch_id: i64,
    sent: i32,
    failed: i32,
) -> Result<bool> {
    let result = ScheduledBatch::update_many()
        .col_expr(
            scheduled_batch::Column::Status,
            Expr::value(BatchStatus::Completed.as_str()),
        )
        .col_expr(scheduled_batch::Column::SentCount, Expr::value(sent))
        .col_expr(scheduled_batch::Column::FailedCount, Expr::value(failed))
        .filter(scheduled_batch::Column::Id.eq(batch_id))
        .filter(scheduled_batch::Column::Status.eq(BatchStatus::Processing))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(batch_id, "Batch was not processing, completion not recorded");
    }
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_schedule_and_list() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let a = create_test_debtor(&db, &ctx, "A").await?;
        let b = create_test_debtor(&db, &ctx, "B").await?;
        let when = Utc::now() + Duration::days(1);

        let scheduled = schedule_batch(&db, &ctx, &[b.id, a.id, b.id], when).await?;
        assert_eq!(scheduled.batch.status, BatchStatus::Pending);
        assert_eq!(scheduled.debtor_ids, vec![b.id, a.id]);
        assert!(scheduled.batch.sent_count.is_none());

        let listed = list_scheduled(&db, &ctx).await?;
        assert_eq!(listed, vec![scheduled]);
        assert!(list_scheduled(&db, &other_ctx()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_schedule_is_all_or_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_debtor(&db, &owner_ctx(), "Mine").await?;
        let theirs = create_test_debtor(&db, &other_ctx(), "Theirs").await?;

        let result = schedule_batch(&db, &owner_ctx(), &[mine.id, theirs.id], Utc::now()).await;
        assert!(matches!(result, Err(Error::DebtorNotFound { id }) if id == theirs.id));
        assert!(ScheduledBatch::find().all(&db).await?.is_empty());
        assert!(BatchRecipient::find().all(&db).await?.is_empty());

        let empty = schedule_batch(&db, &owner_ctx(), &[], Utc::now()).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_pending_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let debtor = create_test_debtor(&db, &ctx, "Cancel").await?;
        let scheduled = schedule_batch(&db, &ctx, &[debtor.id], Utc::now()).await?;

        let foreign = cancel_batch(&db, &other_ctx(), scheduled.batch.id).await;
        assert!(matches!(foreign, Err(Error::ScheduleNotFound { .. })));

        cancel_batch(&db, &ctx, scheduled.batch.id).await?;
        assert!(list_scheduled(&db, &ctx).await?.is_empty());
        assert!(BatchRecipient::find().all(&db).await?.is_empty());

        let again = cancel_batch(&db, &ctx, scheduled.batch.id).await;
        assert!(matches!(again, Err(Error::ScheduleNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_processing_batch_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let debtor = create_test_debtor(&db, &ctx, "Busy").await?;
        let scheduled = schedule_batch(&db, &ctx, &[debtor.id], Utc::now()).await?;

        assert!(mark_processing(&db, scheduled.batch.id).await?);
        let result = cancel_batch(&db, &ctx, scheduled.batch.id).await;
        assert!(matches!(result, Err(Error::InvalidState { .. })));
        assert_eq!(list_scheduled(&db, &ctx).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let debtor = create_test_debtor(&db, &ctx, "Cycle").await?;
        let now = Utc::now();
        let past = schedule_batch(&db, &ctx, &[debtor.id], now - Duration::minutes(5)).await?;
        schedule_batch(&db, &ctx, &[debtor.id], now + Duration::hours(1)).await?;

        let due = get_pending_due(&db, now).await?;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].batch.id, past.batch.id);
        assert_eq!(due[0].debtor_ids, vec![debtor.id]);

        assert!(mark_processing(&db, past.batch.id).await?);
        assert!(!mark_processing(&db, past.batch.id).await?);
        assert!(get_pending_due(&db, now).await?.is_empty());

        assert!(mark_completed(&db, past.batch.id, 1, 0).await?);
        assert!(!mark_completed(&db, past.batch.id, 1, 0).await?);
        let stored = ScheduledBatch::find_by_id(past.batch.id).one(&db).await?.unwrap();
        assert_eq!(stored.status, BatchStatus::Completed);
        assert_eq!(stored.sent_count, Some(1));
        assert_eq!(stored.failed_count, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_schedule_batch_larger_than_one_statement() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let due = Utc::now() - Duration::days(1);

        let debtors: Vec<debtor::ActiveModel> = (0..12_000)
            .map(|n| debtor::ActiveModel {
                name: Set(format!("Debtor {n}")),
                email: Set(format!("debtor{n}@example.com")),
                debt_amount: Set(100.0),
                payment_due_date: Set(due),
                status: Set(crate::entities::DebtorStatus::Overdue),
                amount_paid: Set(None),
                notes: Set(None),
                last_email_sent: Set(None),
                created_by: Set(OWNER.to_string()),
                created_at: Set(due),
                ..Default::default()
            })
            .collect();
        for chunk in debtors.chunks(MAX_ROWS_PER_STATEMENT) {
            Debtor::insert_many(chunk.iter().cloned()).exec(&db).await?;
        }
        let ids: Vec<i64> = Debtor::find()
            .select_only()
            .column(debtor::Column::Id)
            .order_by_asc(debtor::Column::Id)
            .into_tuple()
            .all(&db)
            .await?;
        assert_eq!(ids.len(), 12_000);

        let scheduled = schedule_batch(&db, &ctx, &ids, Utc::now()).await?;
        assert_eq!(scheduled.debtor_ids, ids);

        let listed = list_scheduled(&db, &ctx).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].debtor_ids, ids);

        let foreign = create_test_debtor(&db, &other_ctx(), "Outsider").await?;
        let mut with_foreign = ids.clone();
        with_foreign.push(foreign.id);
        let rejected = schedule_batch(&db, &ctx, &with_foreign, Utc::now()).await;
        assert!(matches!(rejected, Err(Error::DebtorNotFound { id }) if id == foreign.id));
        assert_eq!(list_scheduled(&db, &ctx).await?.len(), 1);
        Ok(())
    }
}
