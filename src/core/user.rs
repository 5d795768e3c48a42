//! User directory - display names for identities.
//!
//! The identity provider owns authentication; this module only stores the profile
//! details other features display, such as communication authors.

use crate::{
    config::database::MAX_ROWS_PER_STATEMENT,
    entities::{User, user},
    errors::Result,
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use std::collections::HashMap;

/// Name shown for authors without a user record or display name.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Creates or refreshes the profile for `user_id`.
///
/// # Errors
/// Returns an error if the database write fails.
pub async fn upsert_user(
    db: &DatabaseConnection,
    user_id: &str,
    name: Option<String>,
    email: Option<String>,
) -> Result<user::Model> {
    let model = user::ActiveModel {
        id: Set(user_id.to_string()),
        name: Set(name),
        email: Set(email),
    };

    User::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_columns([user::Column::Name, user::Column::Email])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    User::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("user {user_id}")).into())
}

/// Retrieves a user profile by identity.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_user(db: &DatabaseConnection, user_id: &str) -> Result<Option<user::Model>> {
    User::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves display names for a set of identities in one query.
///
/// Identities without a record or without a name map to [`UNKNOWN_USER`].
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn display_names<C>(db: &C, user_ids: &[String]) -> Result<HashMap<String, String>>
where
    C: ConnectionTrait,
{
    let mut names: HashMap<String, String> = user_ids
        .iter()
        .map(|id| (id.clone(), UNKNOWN_USER.to_string()))
        .collect();

    for chunk in user_ids.chunks(MAX_ROWS_PER_STATEMENT) {
        let users = User::find()
            .filter(user::Column::Id.is_in(chunk.iter().cloned()))
            .all(db)
            .await?;

        for user in users {
            if let Some(name) = user.name.filter(|n| !n.trim().is_empty()) {
                names.insert(user.id, name);
            }
        }
    }

    Ok(names)
}
