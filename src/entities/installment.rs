//! Installment entity - One payment within a payment plan.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Installment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    /// Unique identifier for the installment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Plan this installment belongs to
    pub payment_plan_id: i64,
    /// Zero-based position within the plan
    pub sequence: i32,
    /// Amount due for this installment in dollars
    pub amount: f64,
    /// When this installment is due
    pub due_date: DateTimeUtc,
    /// Whether this installment has been paid
    pub paid: bool,
}

/// Defines relationships between Installment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each installment belongs to one payment plan
    #[sea_orm(
        belongs_to = "super::payment_plan::Entity",
        from = "Column::PaymentPlanId",
        to = "super::payment_plan::Column::Id"
    )]
    PaymentPlan,
}

impl Related<super::payment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
