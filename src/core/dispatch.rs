//! Reminder dispatch - sends reminder emails and runs the two periodic sweeps.
//!
//! Every send goes through [`ReminderDispatcher::send_reminder`]: load the debtor,
//! compose the reminder, hand it to the [`Mailer`], and on success record the send
//! time. Sweeps are sequential and count failures instead of stopping on them.

use crate::{
    core::{auth::RequestContext, debtor, reminder::compose_reminder, scheduled_batch},
    errors::{Error, Result},
    mail::{Mailer, OutgoingEmail},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of [`ReminderDispatcher::send_bulk_now`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSendSummary {
    /// Ids passed in
    pub requested: usize,
    /// Reminders accepted by the mailer
    pub sent: usize,
    /// Owned debtors whose reminder failed
    pub failed: usize,
    /// Ids the caller does not own or that do not exist
    pub skipped: usize,
}

/// Outcome of one overdue sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverdueSweepReport {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Counts for one batch processed by the batch sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: i64,
    pub sent: i32,
    pub failed: i32,
}

/// Outcome of one batch sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSweepReport {
    /// Batches this sweep claimed and completed
    pub batches: Vec<BatchOutcome>,
}

impl BatchSweepReport {
    /// Number of batches processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.batches.len()
    }
}

/// Sends reminder emails on behalf of callers and the scheduler.
pub struct ReminderDispatcher {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl ReminderDispatcher {
    /// Creates a dispatcher sending as `from`.
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            db,
            mailer,
            from: from.into(),
        }
    }

    /// Sends one reminder to a debtor without any ownership check.
    ///
    /// # Errors
    /// Returns [`Error::DebtorNotFound`] if the debtor is gone, [`Error::Mail`] if the
    /// mailer rejects the message, or a database error. `last_email_sent` is only
    /// written after a successful send.
    pub async fn send_reminder(&self, debtor_id: i64) -> Result<()> {
        let debtor = debtor::get_debtor_by_id(&self.db, debtor_id)
            .await?
            .ok_or(Error::DebtorNotFound { id: debtor_id })?;

        let reminder = compose_reminder(&debtor, Utc::now());
        let email = OutgoingEmail {
            from: self.from.clone(),
            to: debtor.email.clone(),
            subject: reminder.subject,
            html: reminder.html,
        };

        self.mailer.send(&email).await?;
        debtor::mark_email_sent(&self.db, debtor_id, Utc::now()).await?;
        debug!(debtor_id, to = %email.to, "Reminder sent");
        Ok(())
    }

    /// Sends a reminder to one of the caller's debtors right away.
    ///
    /// # Errors
    /// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`], or the send
    /// failure.
    pub async fn send_now(&self, ctx: &RequestContext, debtor_id: i64) -> Result<()> {
        let owner = ctx.require_user()?;
        debtor::find_owned_debtor(&self.db, owner, debtor_id).await?;
        self.send_reminder(debtor_id).await
    }

    /// Sends reminders to several of the caller's debtors, one after another.
    ///
    /// Ids the caller does not own are skipped and individual send failures are only
    /// counted.
    ///
    /// # Errors
    /// Returns [`Error::NotAuthenticated`] or a database error from the ownership
    /// lookups.
    pub async fn send_bulk_now(
        &self,
        ctx: &RequestContext,
        debtor_ids: &[i64],
    ) -> Result<BulkSendSummary> {
        let owner = ctx.require_user()?;
        let mut summary = BulkSendSummary {
            requested: debtor_ids.len(),
            ..BulkSendSummary::default()
        };

        for &debtor_id in debtor_ids {
            match debtor::find_owned_debtor(&self.db, owner, debtor_id).await {
                Ok(_) => {}
                Err(Error::DebtorNotFound { .. }) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            match self.send_reminder(debtor_id).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    warn!(debtor_id, "Bulk reminder failed: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!(
            requested = summary.requested,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            "Bulk reminders finished"
        );
        Ok(summary)
    }

    /// Emails every overdue debtor that has not been reminded in the last 24 hours.
    ///
    /// # Errors
    /// Returns an error only if selecting the debtors fails.
    pub async fn run_overdue_sweep(&self) -> Result<OverdueSweepReport> {
        let due = debtor::get_overdue_debtors_due_for_reminder(&self.db, Utc::now()).await?;
        let mut report = OverdueSweepReport {
            selected: due.len(),
            ..OverdueSweepReport::default()
        };

        for debtor in due {
            match self.send_reminder(debtor.id).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    error!(debtor_id = debtor.id, email = %debtor.email, "Overdue reminder failed: {e}");
                    report.failed += 1;
                }
            }
        }

        info!(
            selected = report.selected,
            sent = report.sent,
            failed = report.failed,
            "Overdue sweep finished"
        );
        Ok(report)
    }

    /// Processes every pending batch whose scheduled time has passed.
    ///
    /// Each batch is claimed (`pending` -> `processing`), its recipients are sent in
    /// order, and it is marked `completed` with the counts. A batch another sweep has
    /// already claimed is skipped. A batch whose status update fails is logged and left
    /// out of the report, and the sweep moves on to the next one.
    ///
    /// # Errors
    /// Returns a database error if the due batches cannot be loaded; send failures are
    /// only counted.
    pub async fn run_batch_sweep(&self) -> Result<BatchSweepReport> {
        let due = scheduled_batch::get_pending_due(&self.db, Utc::now()).await?;
        let mut report = BatchSweepReport::default();

        for entry in due {
            let batch_id = entry.batch.id;
            match scheduled_batch::mark_processing(&self.db, batch_id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(batch_id, "Batch already claimed, skipping");
                    continue;
                }
                Err(e) => {
                    error!(batch_id, "Failed to claim batch: {e}");
                    continue;
                }
            }

            let mut outcome = BatchOutcome {
                batch_id,
                sent: 0,
                failed: 0,
            };
            for debtor_id in entry.debtor_ids {
                match self.send_reminder(debtor_id).await {
                    Ok(()) => outcome.sent += 1,
                    Err(e) => {
                        warn!(batch_id, debtor_id, "Scheduled reminder failed: {e}");
                        outcome.failed += 1;
                    }
                }
            }

            if let Err(e) =
                scheduled_batch::mark_completed(&self.db, batch_id, outcome.sent, outcome.failed)
                    .await
            {
                error!(
                    batch_id,
                    sent = outcome.sent,
                    failed = outcome.failed,
                    "Failed to record batch completion: {e}"
                );
                continue;
            }
            info!(
                batch_id,
                sent = outcome.sent,
                failed = outcome.failed,
                "Batch completed"
            );
            report.batches.push(outcome);
        }

        Ok(report)
    }
}
