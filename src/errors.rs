//! Unified error type for the debt tracker.
//!
//! Ownership failures and missing records share the same `*NotFound` variants so
//! callers cannot tell whether a record exists under another owner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Debtor not found: {id}")]
    DebtorNotFound { id: i64 },

    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: i64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Import stopped at row {row} after {imported} rows: {message}")]
    Import {
        row: usize,
        imported: usize,
        message: String,
    },

    #[error("Failed to send email: {message}")]
    Mail { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn mail(message: impl std::fmt::Display) -> Self {
        Self::Mail {
            message: message.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
