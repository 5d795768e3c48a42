//! Debtor entity - A tracked individual or company that owes money.
//!
//! Each debtor carries the owed amount, a payment due date, a collection status and
//! the time the last reminder email went out. Every debtor is owned by exactly one
//! identity (`created_by`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Collection status of a debtor.
///
/// Set to `Overdue` or `Pending` at creation; later transitions are explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum DebtorStatus {
    /// Payment due date has not passed yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment due date passed without full payment
    #[sea_orm(string_value = "overdue")]
    Overdue,
    /// Settled in full
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Some money received, balance outstanding
    #[sea_orm(string_value = "partial")]
    Partial,
}

impl DebtorStatus {
    /// Initial status for a debtor created at `now`.
    #[must_use]
    pub fn initial(payment_due_date: DateTimeUtc, now: DateTimeUtc) -> Self {
        if payment_due_date < now {
            Self::Overdue
        } else {
            Self::Pending
        }
    }

    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
            Self::Partial => "partial",
        }
    }
}

impl std::fmt::Display for DebtorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debtor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debtors")]
pub struct Model {
    /// Unique identifier for the debtor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Debtor name as shown in lists and emails
    pub name: String,
    /// Address reminders are sent to
    pub email: String,
    /// Total amount owed in dollars
    pub debt_amount: f64,
    /// When payment is (or was) due
    pub payment_due_date: DateTimeUtc,
    /// Current collection status
    pub status: DebtorStatus,
    /// Amount received so far, if any was recorded
    pub amount_paid: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the last reminder email was delivered to the mail provider
    pub last_email_sent: Option<DateTimeUtc>,
    /// Identity that owns this record
    pub created_by: String,
    /// When the debtor was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Debt amount minus whatever has been paid.
    #[must_use]
    pub fn outstanding(&self) -> f64 {
        self.debt_amount - self.amount_paid.unwrap_or(0.0)
    }
}

// Communications, payment plans and batch recipients reference debtors by id only.
// No foreign keys are declared so deleting a debtor leaves those rows in place.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
