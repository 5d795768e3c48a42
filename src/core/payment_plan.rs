//! Payment plan business logic.
//!
//! A plan splits a debtor's full debt amount into equal installments spaced
//! [`INSTALLMENT_SPACING_DAYS`] apart. Plans are created once and never modified; no
//! operation marks an installment as paid.

use crate::{
    config::database::MAX_ROWS_PER_STATEMENT,
    core::{auth::RequestContext, debtor::find_owned_debtor},
    entities::{Installment, PaymentPlan, installment, payment_plan},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Days between consecutive installments.
pub const INSTALLMENT_SPACING_DAYS: i64 = 30;

/// Largest accepted installment count (fifty years of monthly payments).
pub const MAX_INSTALLMENTS: u32 = 600;

/// Installment values before they are stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallmentDraft {
    /// Amount due
    pub amount: f64,
    /// When it is due
    pub due_date: DateTime<Utc>,
}

/// A plan together with its installments in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlanDetails {
    /// The stored plan
    pub plan: payment_plan::Model,
    /// Installments ordered by sequence
    pub installments: Vec<installment::Model>,
}

/// Splits `debt_amount` into `count` equal installments starting at `start_date`.
///
/// Every installment gets `debt_amount / count`; the last one is not adjusted for
/// floating point remainders.
///
/// # Errors
/// Returns [`Error::Validation`] if `count` is zero or above [`MAX_INSTALLMENTS`], or
/// if a due date falls outside the representable date range.
pub fn compute_installments(
    debt_amount: f64,
    count: u32,
    start_date: DateTime<Utc>,
) -> Result<Vec<InstallmentDraft>> {
    if count == 0 {
        return Err(Error::validation("A payment plan needs at least one installment"));
    }
    if count > MAX_INSTALLMENTS {
        return Err(Error::validation(format!(
            "A payment plan can have at most {MAX_INSTALLMENTS} installments, got {count}"
        )));
    }

    let amount = debt_amount / f64::from(count);
    (0..count)
        .map(|index| {
            Duration::try_days(INSTALLMENT_SPACING_DAYS * i64::from(index))
                .and_then(|offset| start_date.checked_add_signed(offset))
                .map(|due_date| InstallmentDraft { amount, due_date })
                .ok_or_else(|| {
                    Error::validation(format!(
                        "Installment {} would fall outside the supported date range",
                        index + 1
                    ))
                })
        })
        .collect()
}

async fn load_installments<C>(db: &C, plan_id: i64) -> Result<Vec<installment::Model>>
where
    C: ConnectionTrait,
{
    Installment::find()
        .filter(installment::Column::PaymentPlanId.eq(plan_id))
        .order_by_asc(installment::Column::Sequence)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn first_plan_for_debtor<C>(db: &C, debtor_id: i64) -> Result<Option<payment_plan::Model>>
where
    C: ConnectionTrait,
{
    PaymentPlan::find()
        .filter(payment_plan::Column::DebtorId.eq(debtor_id))
        .order_by_asc(payment_plan::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the debtor's payment plan.
///
/// Anonymous callers get `None` rather than an error, as do callers who do not own the
/// plan.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_for_debtor(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_id: i64,
) -> Result<Option<PaymentPlanDetails>> {
    let Some(caller) = ctx.user_id() else {
        return Ok(None);
    };

    let Some(plan) = first_plan_for_debtor(db, debtor_id)
        .await?
        .filter(|p| p.created_by == caller)
    else {
        return Ok(None);
    };

    let installments = load_installments(db, plan.id).await?;
    Ok(Some(PaymentPlanDetails { plan, installments }))
}

/// Creates a payment plan for one of the caller's debtors.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`],
/// [`Error::Validation`] for a zero or oversized installment count,
/// [`Error::InvalidState`] if the debtor already has a plan, or a database error.
pub async fn create_payment_plan(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_id: i64,
    installment_count: u32,
    start_date: DateTime<Utc>,
) -> Result<PaymentPlanDetails> {
    let owner = ctx.require_user()?;
    let debtor = find_owned_debtor(db, owner, debtor_id).await?;
    let drafts = compute_installments(debtor.debt_amount, installment_count, start_date)?;

    if first_plan_for_debtor(db, debtor_id).await?.is_some() {
        return Err(Error::InvalidState {
            message: format!("Debtor {debtor_id} already has a payment plan"),
        });
    }

    let txn = db.begin().await?;

    let plan = payment_plan::ActiveModel {
        debtor_id: Set(debtor_id),
        status: Set(payment_plan::ACTIVE_STATUS.to_string()),
        created_by: Set(owner.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let rows: Vec<installment::ActiveModel> = drafts
        .iter()
        .zip(0_i32..)
        .map(|(draft, sequence)| installment::ActiveModel {
            payment_plan_id: Set(plan.id),
            sequence: Set(sequence),
            amount: Set(draft.amount),
            due_date: Set(draft.due_date),
            paid: Set(false),
            ..Default::default()
        })
        .collect();
    for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        Installment::insert_many(chunk.iter().cloned()).exec(&txn).await?;
    }

    let installments = load_installments(&txn, plan.id).await?;
    txn.commit().await?;

    info!(
        debtor_id,
        plan_id = plan.id,
        installments = installments.len(),
        "Payment plan created"
    );
    Ok(PaymentPlanDetails { plan, installments })
}
