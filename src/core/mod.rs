/// Caller identity passed into every caller-facing operation
pub mod auth;

/// Append-only communication log per debtor
pub mod communication;

/// Debtor records, status changes, search and dashboard totals
pub mod debtor;

/// Reminder sending and the periodic sweeps
pub mod dispatch;

/// CSV import of debtors
pub mod import;

/// Tri-state updates for optional fields
pub mod patch;

/// Installment plans
pub mod payment_plan;

/// Reminder email composition
pub mod reminder;

/// Debt by status and payments over time
pub mod report;

/// Scheduled reminder batches
pub mod scheduled_batch;

/// Display names for identities
pub mod user;
