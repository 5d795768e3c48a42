//! Communication entity - Append-only log of interactions with a debtor.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of interaction that was logged
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum CommunicationType {
    /// Phone call
    #[sea_orm(string_value = "call")]
    Call,
    /// Email exchanged outside the reminder system
    #[sea_orm(string_value = "email")]
    Email,
    /// Internal note
    #[sea_orm(string_value = "note")]
    Note,
    /// Physical letter
    #[sea_orm(string_value = "letter")]
    Letter,
}

/// Communication database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communications")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Debtor this entry belongs to
    pub debtor_id: i64,
    /// Kind of interaction
    #[sea_orm(column_name = "type")]
    pub kind: CommunicationType,
    /// What was said or done
    pub content: String,
    /// Opaque blob-storage reference for an attached file
    pub file_id: Option<String>,
    /// Display name of the attached file
    pub file_name: Option<String>,
    /// Identity that logged the entry
    pub created_by: String,
    /// When the entry was logged
    pub created_at: DateTimeUtc,
}

/// Debtor references are plain ids, see [`super::debtor::Relation`]
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
