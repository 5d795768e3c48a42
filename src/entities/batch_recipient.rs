//! Batch recipient entity - One debtor inside a scheduled batch.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Batch recipient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_recipients")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Batch this recipient belongs to
    pub batch_id: i64,
    /// Debtor to email; not a foreign key, the debtor may since have been deleted
    pub debtor_id: i64,
    /// Zero-based order within the batch
    pub position: i32,
}

/// Defines relationships between `BatchRecipient` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recipient belongs to one batch
    #[sea_orm(
        belongs_to = "super::scheduled_batch::Entity",
        from = "Column::BatchId",
        to = "super::scheduled_batch::Column::Id",
        on_delete = "Cascade"
    )]
    ScheduledBatch,
}

impl Related<super::scheduled_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduledBatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
