//! Periodic triggers for the reminder sweeps.
//!
//! Each sweep runs in its own tokio task on a fixed interval. The two tasks are
//! independent and may overlap; a sweep that fails is logged and retried on the next
//! tick.

use crate::{config::ScheduleConfig, core::dispatch::ReminderDispatcher};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

/// Handles to the running sweep tasks.
#[derive(Debug)]
pub struct SweepHandles {
    overdue: JoinHandle<()>,
    batch: JoinHandle<()>,
}

impl SweepHandles {
    /// Stops both sweeps. A sweep in the middle of sending stops at its next await.
    pub fn abort(&self) {
        self.overdue.abort();
        self.batch.abort();
    }

    /// Whether both tasks have stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.overdue.is_finished() && self.batch.is_finished()
    }
}

/// Starts both sweeps with the configured intervals.
#[must_use]
pub fn spawn_sweeps(dispatcher: Arc<ReminderDispatcher>, config: &ScheduleConfig) -> SweepHandles {
    spawn_sweeps_with_intervals(
        dispatcher,
        config.overdue_sweep_interval(),
        config.batch_sweep_interval(),
    )
}

/// Starts both sweeps; the first run of each happens immediately.
#[must_use]
pub fn spawn_sweeps_with_intervals(
    dispatcher: Arc<ReminderDispatcher>,
    overdue_every: Duration,
    batch_every: Duration,
) -> SweepHandles {
    info!(
        overdue_secs = overdue_every.as_secs(),
        batch_secs = batch_every.as_secs(),
        "Reminder sweeps started"
    );

    let overdue_dispatcher = Arc::clone(&dispatcher);
    let overdue = tokio::spawn(async move {
        let mut interval = tokio::time::interval(overdue_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = overdue_dispatcher.run_overdue_sweep().await {
                error!("Overdue sweep failed: {e}");
            }
        }
    });

    let batch = tokio::spawn(async move {
        let mut interval = tokio::time::interval(batch_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match dispatcher.run_batch_sweep().await {
                Ok(report) if report.processed() > 0 => {
                    info!(processed = report.processed(), "Batch sweep finished");
                }
                Ok(_) => {}
                Err(e) => error!("Batch sweep failed: {e}"),
            }
        }
    });

    SweepHandles { overdue, batch }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{debtor::get_debtor, scheduled_batch},
        entities::{BatchStatus, ScheduledBatch},
        errors::Result,
        mail::Mailer,
        test_utils::*,
    };
    use chrono::Utc;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn test_sweeps_run_on_their_own() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let overdue = create_test_debtor(&db, &ctx, "Overdue").await?;
        let scheduled = scheduled_batch::schedule_batch(
            &db,
            &ctx,
            &[overdue.id],
            Utc::now() - chrono::Duration::seconds(1),
        )
        .await?;

        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = Arc::new(ReminderDispatcher::new(
            db.clone(),
            Arc::clone(&mailer) as Arc<dyn Mailer>,
            "Debt Collection <noreply@example.com>",
        ));

        let handles = spawn_sweeps_with_intervals(
            dispatcher,
            Duration::from_millis(20),
            Duration::from_millis(20),
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!handles.is_finished());
        handles.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handles.is_finished());

        let batch = ScheduledBatch::find_by_id(scheduled.batch.id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert!(
            get_debtor(&db, &ctx, overdue.id)
                .await?
                .unwrap()
                .last_email_sent
                .is_some()
        );
        // one from whichever sweep ran first, at most one more from the other
        let sent = mailer.sent().len();
        assert!((1..=2).contains(&sent));
        Ok(())
    }
}
