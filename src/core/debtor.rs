//! Debtor business logic - Handles all debtor-related operations.
//!
//! Provides functions for adding, importing, listing, updating and deleting debtors,
//! plus the aggregate figures shown on the dashboard. Every caller-facing function
//! takes a [`RequestContext`] and only ever sees debtors owned by that caller; a
//! debtor owned by someone else is reported exactly like a missing one.
//!
//! The `pub(crate)` helpers at the bottom are used by the reminder dispatcher and skip
//! ownership checks.

use crate::{
    core::{auth::RequestContext, patch::Patch},
    entities::{Debtor, DebtorStatus, debtor},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{debug, info, warn};

/// Minimum gap between two overdue reminders to the same debtor.
pub const REMINDER_COOLDOWN_HOURS: i64 = 24;

/// Input for creating a debtor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebtor {
    /// Debtor name
    pub name: String,
    /// Address reminders are sent to
    pub email: String,
    /// Amount owed in dollars
    pub debt_amount: f64,
    /// When payment is due
    pub payment_due_date: DateTime<Utc>,
    /// Optional free-form notes
    pub notes: Option<String>,
}

/// Aggregate figures over all of a caller's debtors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtorStats {
    /// Sum of all debt amounts
    pub total_debt: f64,
    /// Sum of all recorded payments
    pub total_paid: f64,
    /// `total_debt - total_paid`
    pub total_outstanding: f64,
    /// Debtors with status `overdue`
    pub overdue: usize,
    /// Debtors with status `pending`
    pub pending: usize,
    /// All debtors
    pub total: usize,
}

/// Result of seeding demonstration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSeedOutcome {
    /// Whether anything was inserted
    pub created: bool,
    /// Number of debtors inserted
    pub count: usize,
}

fn validate_new_debtor(new_debtor: &NewDebtor) -> Result<()> {
    if new_debtor.name.trim().is_empty() {
        return Err(Error::validation("Debtor name cannot be empty"));
    }

    let email = new_debtor.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation(format!(
            "Invalid email address: {:?}",
            new_debtor.email
        )));
    }

    if !new_debtor.debt_amount.is_finite() || new_debtor.debt_amount < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new_debtor.debt_amount,
        });
    }

    Ok(())
}

fn validate_amount_paid(amount_paid: Patch<f64>) -> Result<()> {
    if let Some(&amount) = amount_paid.as_set() {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount { amount });
        }
    }
    Ok(())
}

/// Validates and inserts a single debtor owned by `owner`.
async fn insert_debtor(
    db: &DatabaseConnection,
    owner: &str,
    new_debtor: NewDebtor,
) -> Result<debtor::Model> {
    validate_new_debtor(&new_debtor)?;

    let now = Utc::now();
    let status = DebtorStatus::initial(new_debtor.payment_due_date, now);
    let notes = new_debtor
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let model = debtor::ActiveModel {
        name: Set(new_debtor.name.trim().to_string()),
        email: Set(new_debtor.email.trim().to_string()),
        debt_amount: Set(new_debtor.debt_amount),
        payment_due_date: Set(new_debtor.payment_due_date),
        status: Set(status),
        amount_paid: Set(None),
        notes: Set(notes),
        last_email_sent: Set(None),
        created_by: Set(owner.to_string()),
        created_at: Set(now),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Adds a debtor owned by the caller.
///
/// The initial status is `overdue` if the due date has already passed and `pending`
/// otherwise. No duplicate detection is performed.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], a validation error for malformed input, or a
/// database error.
pub async fn add_debtor(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new_debtor: NewDebtor,
) -> Result<debtor::Model> {
    let owner = ctx.require_user()?;
    let created = insert_debtor(db, owner, new_debtor).await?;
    debug!(debtor_id = created.id, status = %created.status, "Debtor added");
    Ok(created)
}

/// Inserts rows one at a time until the first failure.
///
/// There is no rollback: rows inserted before a failing row stay committed, and the
/// returned [`Error::Import`] says which row (1-based) failed and how many made it in.
pub(crate) async fn import_rows<I>(db: &DatabaseConnection, owner: &str, rows: I) -> Result<Vec<i64>>
where
    I: IntoIterator<Item = Result<NewDebtor>>,
{
    let mut ids = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        let inserted = match row {
            Ok(new_debtor) => insert_debtor(db, owner, new_debtor).await,
            Err(e) => Err(e),
        };

        match inserted {
            Ok(model) => ids.push(model.id),
            Err(e) => {
                warn!(row = index + 1, imported = ids.len(), "Debtor import stopped: {e}");
                return Err(Error::Import {
                    row: index + 1,
                    imported: ids.len(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(count = ids.len(), "Imported debtors");
    Ok(ids)
}

/// Imports many debtors for the caller, best-effort.
///
/// Each row gets the same validation and status derivation as [`add_debtor`]. Rows are
/// inserted in order and earlier rows remain committed if a later one fails.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] or [`Error::Import`] describing the failing row.
pub async fn import_debtors(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    rows: Vec<NewDebtor>,
) -> Result<Vec<i64>> {
    let owner = ctx.require_user()?;
    import_rows(db, owner, rows.into_iter().map(Ok)).await
}

/// Looks up a debtor for the caller, returning `None` if the caller is anonymous, the
/// debtor does not exist, or it belongs to someone else.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_debtor(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_id: i64,
) -> Result<Option<debtor::Model>> {
    let Some(owner) = ctx.user_id() else {
        return Ok(None);
    };

    Ok(get_debtor_by_id(db, debtor_id)
        .await?
        .filter(|d| d.created_by == owner))
}

/// Fetches a debtor owned by `owner`, treating foreign records as missing.
pub(crate) async fn find_owned_debtor<C>(db: &C, owner: &str, debtor_id: i64) -> Result<debtor::Model>
where
    C: ConnectionTrait,
{
    Debtor::find_by_id(debtor_id)
        .one(db)
        .await?
        .filter(|d| d.created_by == owner)
        .ok_or(Error::DebtorNotFound { id: debtor_id })
}

/// Records a payment status change.
///
/// Overwrites `status` and applies `amount_paid` as a patch: [`Patch::Unset`] keeps
/// the current amount, [`Patch::Clear`] removes it, [`Patch::Set`] replaces it. Name,
/// email and debt amount are never touched.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`],
/// [`Error::InvalidAmount`] for a negative or non-finite amount, or a database error.
pub async fn update_status(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_id: i64,
    status: DebtorStatus,
    amount_paid: Patch<f64>,
) -> Result<debtor::Model> {
    let owner = ctx.require_user()?;
    validate_amount_paid(amount_paid)?;

    let existing = find_owned_debtor(db, owner, debtor_id).await?;

    let mut active_model: debtor::ActiveModel = existing.into();
    active_model.status = Set(status);
    amount_paid.apply_to(&mut active_model.amount_paid);

    let updated = active_model.update(db).await?;
    debug!(debtor_id, status = %updated.status, "Debtor status updated");
    Ok(updated)
}

/// Deletes a debtor owned by the caller.
///
/// Communications, payment plans and batch recipients referencing the debtor are left
/// in place.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`], or a database error.
pub async fn delete_debtor(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    debtor_id: i64,
) -> Result<()> {
    let owner = ctx.require_user()?;
    let existing = find_owned_debtor(db, owner, debtor_id).await?;
    existing.delete(db).await?;
    debug!(debtor_id, "Debtor deleted");
    Ok(())
}

/// Lists the caller's debtors, newest first.
///
/// A non-blank `search` keeps debtors whose name or email contains it, ignoring case.
/// The filter runs over the full owned set after it has been fetched.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] or a database error.
pub async fn list_debtors(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    search: Option<&str>,
) -> Result<Vec<debtor::Model>> {
    let owner = ctx.require_user()?;

    let debtors = Debtor::find()
        .filter(debtor::Column::CreatedBy.eq(owner))
        .order_by_desc(debtor::Column::CreatedAt)
        .order_by_desc(debtor::Column::Id)
        .all(db)
        .await?;

    let query = search.map(str::trim).filter(|q| !q.is_empty());
    let Some(query) = query else {
        return Ok(debtors);
    };

    let query = query.to_lowercase();
    Ok(debtors
        .into_iter()
        .filter(|d| {
            d.name.to_lowercase().contains(&query) || d.email.to_lowercase().contains(&query)
        })
        .collect())
}

/// Computes dashboard totals over the caller's debtors.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] or a database error.
pub async fn get_stats(db: &DatabaseConnection, ctx: &RequestContext) -> Result<DebtorStats> {
    let owner = ctx.require_user()?;

    let debtors = Debtor::find()
        .filter(debtor::Column::CreatedBy.eq(owner))
        .all(db)
        .await?;

    Ok(calculate_stats(&debtors))
}

/// Aggregates totals and status counts for a set of debtors.
#[must_use]
pub fn calculate_stats(debtors: &[debtor::Model]) -> DebtorStats {
    let total_debt: f64 = debtors.iter().map(|d| d.debt_amount).sum();
    let total_paid: f64 = debtors.iter().map(|d| d.amount_paid.unwrap_or(0.0)).sum();
    let count_status = |status| debtors.iter().filter(|d| d.status == status).count();

    DebtorStats {
        total_debt,
        total_paid,
        total_outstanding: total_debt - total_paid,
        overdue: count_status(DebtorStatus::Overdue),
        pending: count_status(DebtorStatus::Pending),
        total: debtors.len(),
    }
}

/// Inserts a fixed set of demonstration debtors for the caller.
///
/// Nothing is inserted if the caller already owns at least one debtor.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] or a database error.
pub async fn seed_demo_debtors(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<DemoSeedOutcome> {
    let owner = ctx.require_user()?;

    let existing = Debtor::find()
        .filter(debtor::Column::CreatedBy.eq(owner))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(DemoSeedOutcome {
            created: false,
            count: 0,
        });
    }

    let now = Utc::now();
    let day = Duration::days(1);
    let demo: [(&str, &str, f64, DateTime<Utc>, DebtorStatus, Option<f64>, Option<&str>); 8] = [
        (
            "John Smith",
            "john.smith@example.com",
            2500.0,
            now - day * 15,
            DebtorStatus::Overdue,
            None,
            Some("Initial invoice sent on Jan 15. Follow-up required."),
        ),
        (
            "Sarah Johnson",
            "sarah.j@example.com",
            1200.5,
            now - day * 5,
            DebtorStatus::Overdue,
            None,
            Some("Promised payment by end of month."),
        ),
        (
            "Michael Chen",
            "m.chen@example.com",
            3750.0,
            now + day * 10,
            DebtorStatus::Pending,
            None,
            Some("Large account - priority client."),
        ),
        (
            "Emily Rodriguez",
            "emily.r@example.com",
            850.0,
            now + day * 3,
            DebtorStatus::Pending,
            None,
            None,
        ),
        (
            "David Thompson",
            "d.thompson@example.com",
            5000.0,
            now - day * 30,
            DebtorStatus::Partial,
            Some(2000.0),
            Some("Partial payment received. Remaining balance due immediately."),
        ),
        (
            "Lisa Anderson",
            "lisa.anderson@example.com",
            1500.0,
            now - day * 45,
            DebtorStatus::Paid,
            Some(1500.0),
            Some("Paid in full on time."),
        ),
        (
            "Robert Martinez",
            "r.martinez@example.com",
            4200.0,
            now - day * 20,
            DebtorStatus::Overdue,
            None,
            Some("Multiple attempts to contact. Consider legal action."),
        ),
        (
            "Jennifer Lee",
            "jennifer.lee@example.com",
            950.75,
            now + day * 7,
            DebtorStatus::Pending,
            None,
            Some("New client - first invoice."),
        ),
    ];

    let count = demo.len();
    let models = demo.into_iter().map(
        |(name, email, debt_amount, due, status, amount_paid, notes)| debtor::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            debt_amount: Set(debt_amount),
            payment_due_date: Set(due),
            status: Set(status),
            amount_paid: Set(amount_paid),
            notes: Set(notes.map(str::to_string)),
            last_email_sent: Set(None),
            created_by: Set(owner.to_string()),
            created_at: Set(now),
            ..Default::default()
        },
    );
    Debtor::insert_many(models).exec(db).await?;

    info!(count, "Seeded demo debtors");
    Ok(DemoSeedOutcome {
        created: true,
        count,
    })
}

/// Looks up a debtor without any ownership check.
pub(crate) async fn get_debtor_by_id(
    db: &DatabaseConnection,
    debtor_id: i64,
) -> Result<Option<debtor::Model>> {
    Debtor::find_by_id(debtor_id).one(db).await.map_err(Into::into)
}

/// Overdue debtors that were never emailed or last emailed more than
/// [`REMINDER_COOLDOWN_HOURS`] before `now`, in query order.
pub(crate) async fn get_overdue_debtors_due_for_reminder(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<debtor::Model>> {
    let cutoff = now - Duration::hours(REMINDER_COOLDOWN_HOURS);

    let overdue = Debtor::find()
        .filter(debtor::Column::Status.eq(DebtorStatus::Overdue))
        .all(db)
        .await?;

    Ok(overdue
        .into_iter()
        .filter(|d| d.last_email_sent.is_none_or(|sent| sent < cutoff))
        .collect())
}

/// Records that a reminder reached the mail provider at `sent_at`.
pub(crate) async fn mark_email_sent(
    db: &DatabaseConnection,
    debtor_id: i64,
    sent_at: DateTime<Utc>,
) -> Result<()> {
    Debtor::update_many()
        .col_expr(debtor::Column::LastEmailSent, Expr::value(Some(sent_at)))
        .filter(debtor::Column::Id.eq(debtor_id))
        .exec(db)
        .await?;
    Ok(())
}
