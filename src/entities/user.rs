//! User entity - Display information for identities known to the system.
//!
//! Identities themselves come from the external identity provider; this table only
//! mirrors what is needed to label communication authors.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identity string issued by the identity provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Human-readable display name, if the provider supplied one
    pub name: Option<String>,
    /// Contact email, if known
    pub email: Option<String>,
}

/// `User` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
