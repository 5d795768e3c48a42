//! Report generation business logic.
//!
//! Builds the figures behind the reports view: outstanding debt grouped by status and
//! recorded payments grouped by day. Everything is computed from the caller's debtors
//! and returned as plain data for a front end to chart.

use crate::{
    core::auth::RequestContext,
    entities::{Debtor, DebtorStatus, debtor},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, prelude::*};
use std::collections::HashMap;

/// Payments recorded against debtors created on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentPoint {
    /// Creation date (UTC) of the debtors
    pub date: NaiveDate,
    /// Sum of their amounts paid
    pub amount: f64,
}

/// Data for the reports view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtReport {
    /// Total debt amount per status; statuses with no debtors are absent
    pub debt_by_status: HashMap<DebtorStatus, f64>,
    /// Paid and partially paid debtors grouped by creation date, in the order each
    /// date first appears
    pub payments_over_time: Vec<PaymentPoint>,
}

/// Aggregates a set of debtors into a [`DebtReport`].
///
/// `debtors` should be in creation order; that order decides the order of
/// `payments_over_time`.
#[must_use]
pub fn build_report(debtors: &[debtor::Model]) -> DebtReport {
    let mut report = DebtReport::default();

    for d in debtors {
        *report.debt_by_status.entry(d.status).or_insert(0.0) += d.debt_amount;

        if !matches!(d.status, DebtorStatus::Paid | DebtorStatus::Partial) {
            continue;
        }

        let date = d.created_at.date_naive();
        let amount = d.amount_paid.unwrap_or(0.0);
        match report.payments_over_time.iter_mut().find(|p| p.date == date) {
            Some(point) => point.amount += amount,
            None => report.payments_over_time.push(PaymentPoint { date, amount }),
        }
    }

    report
}

/// Builds the report for the caller's debtors.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`](crate::errors::Error::NotAuthenticated) or a
/// database error.
pub async fn get_report(db: &DatabaseConnection, ctx: &RequestContext) -> Result<DebtReport> {
    let owner = ctx.require_user()?;

    let debtors = Debtor::find()
        .filter(debtor::Column::CreatedBy.eq(owner))
        .order_by_asc(debtor::Column::CreatedAt)
        .order_by_asc(debtor::Column::Id)
        .all(db)
        .await?;

    Ok(build_report(&debtors))
}
