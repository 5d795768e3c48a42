//! Scheduled batch entity - A group of debtors to email at a set time.
//!
//! Lifecycle: `pending` -> `processing` -> `completed`. The recipients are stored in
//! `batch_recipients`, ordered by `position`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scheduled batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Waiting for its scheduled time; the only cancellable state
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Picked up by the batch sweep
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Every recipient was attempted
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Declared terminal state; the batch sweep never sets it
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl BatchStatus {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduled batch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduled_batches")]
pub struct Model {
    /// Unique identifier for the batch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// When the batch becomes due
    pub scheduled_for: DateTimeUtc,
    /// Current lifecycle state
    pub status: BatchStatus,
    /// Recipients that were sent successfully, set on completion
    pub sent_count: Option<i32>,
    /// Recipients that failed, set on completion
    pub failed_count: Option<i32>,
    /// Identity that owns this batch
    pub created_by: String,
    /// When the batch was scheduled
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ScheduledBatch` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One batch has many recipients
    #[sea_orm(has_many = "super::batch_recipient::Entity")]
    Recipients,
}

impl Related<super::batch_recipient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
