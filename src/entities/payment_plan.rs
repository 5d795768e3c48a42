//! Payment plan entity - An installment schedule agreed with a debtor.
//!
//! The installments themselves live in the `installments` table, ordered by `sequence`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status written for every new plan
pub const ACTIVE_STATUS: &str = "active";

/// Payment plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Debtor the plan was created for
    pub debtor_id: i64,
    /// Free-text plan status, `"active"` in practice
    pub status: String,
    /// Identity that owns this plan
    pub created_by: String,
    /// When the plan was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `PaymentPlan` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan has many installments
    #[sea_orm(has_many = "super::installment::Entity")]
    Installments,
}

impl Related<super::installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
