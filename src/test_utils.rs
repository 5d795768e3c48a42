//! Shared test utilities for the debt tracker.
//!
//! This module provides common helper functions for setting up test databases,
//! creating debtors with sensible defaults, and a mailer that records instead of
//! sending.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        auth::RequestContext,
        debtor::{NewDebtor, add_debtor},
    },
    entities::debtor,
    errors::{Error, Result},
    mail::{Mailer, OutgoingEmail},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use std::{collections::HashSet, sync::Mutex};
use tracing_subscriber::EnvFilter;

/// Identity used as the owner in most tests
pub const OWNER: &str = "user-owner";
/// A second identity for ownership checks
pub const OTHER: &str = "user-other";

/// Installs a test-friendly tracing subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all tests that touch the database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Context for [`OWNER`].
pub fn owner_ctx() -> RequestContext {
    RequestContext::authenticated(OWNER)
}

/// Context for [`OTHER`].
pub fn other_ctx() -> RequestContext {
    RequestContext::authenticated(OTHER)
}

/// Valid debtor input due at `payment_due_date`.
///
/// # Defaults
/// * `email`: derived from the name, e.g. `"jane.doe@example.com"`
/// * `debt_amount`: 500.0
/// * `notes`: None
pub fn new_debtor(name: &str, payment_due_date: DateTime<Utc>) -> NewDebtor {
    NewDebtor {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        debt_amount: 500.0,
        payment_due_date,
        notes: None,
    }
}

/// Creates an overdue debtor (due ten days ago) owned by the context's caller.
pub async fn create_test_debtor(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    name: &str,
) -> Result<debtor::Model> {
    add_debtor(db, ctx, new_debtor(name, Utc::now() - Duration::days(10))).await
}

/// Mailer double that records every accepted message and fails for chosen addresses.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: HashSet<String>,
}

impl RecordingMailer {
    /// Accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects messages addressed to any of `addresses`.
    pub fn failing_for<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: addresses.into_iter().collect(),
        }
    }

    /// Messages accepted so far, in order.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.failing.contains(&email.to) {
            return Err(Error::mail(format!("mailbox {} rejected", email.to)));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
