//! Communication log business logic.
//!
//! Entries are append-only: this module offers no update or delete. Attached files
//! live in external blob storage; entries only hold the storage id and a file name,
//! and listings resolve a fresh download URL for each attachment.

use crate::{
    core::{auth::RequestContext, debtor::find_owned_debtor, user::display_names},
    entities::{Communication, CommunicationType, communication},
    errors::{Error, Result},
    storage::BlobStore,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Input for logging a communication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommunication {
    /// Debtor the entry belongs to
    pub debtor_id: i64,
    /// Kind of interaction
    pub kind: CommunicationType,
    /// What was said or done
    pub content: String,
    /// Storage id returned by the blob store upload
    pub file_id: Option<String>,
    /// Display name of the uploaded file
    pub file_name: Option<String>,
}

/// A log entry as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationEntry {
    /// The stored entry
    pub communication: communication::Model,
    /// Display name of the author
    pub author: String,
    /// Download URL for the attachment, if there is one and it resolved
    pub file_url: Option<String>,
}

/// Logs a communication against one of the caller's debtors.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`], a validation error
/// when there is neither content nor an attachment, or a database error.
pub async fn add_communication(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new_communication: NewCommunication,
) -> Result<communication::Model> {
    let owner = ctx.require_user()?;
    find_owned_debtor(db, owner, new_communication.debtor_id).await?;

    let file_id = new_communication
        .file_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    if new_communication.content.trim().is_empty() && file_id.is_none() {
        return Err(Error::validation(
            "Communication needs content or an attached file",
        ));
    }

    let model = communication::ActiveModel {
        debtor_id: Set(new_communication.debtor_id),
        kind: Set(new_communication.kind),
        content: Set(new_communication.content),
        file_id: Set(file_id),
        file_name: Set(new_communication.file_name),
        created_by: Set(owner.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    debug!(
        debtor_id = created.debtor_id,
        communication_id = created.id,
        "Communication logged"
    );
    Ok(created)
}

/// Lists a debtor's communications, newest first, with author names and attachment
/// URLs resolved.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], [`Error::DebtorNotFound`], or a database error.
pub async fn list_for_debtor(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    ctx: &RequestContext,
    debtor_id: i64,
) -> Result<Vec<CommunicationEntry>> {
    let owner = ctx.require_user()?;
    find_owned_debtor(db, owner, debtor_id).await?;

    let communications = Communication::find()
        .filter(communication::Column::DebtorId.eq(debtor_id))
        .order_by_desc(communication::Column::CreatedAt)
        .order_by_desc(communication::Column::Id)
        .all(db)
        .await?;

    let mut author_ids: Vec<String> = communications.iter().map(|c| c.created_by.clone()).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = display_names(db, &author_ids).await?;

    let mut entries = Vec::with_capacity(communications.len());
    for communication in communications {
        let file_url = match &communication.file_id {
            Some(file_id) => blobs.resolve_url(file_id).await,
            None => None,
        };
        let author = authors
            .get(&communication.created_by)
            .cloned()
            .unwrap_or_else(|| crate::core::user::UNKNOWN_USER.to_string());

        entries.push(CommunicationEntry {
            communication,
            author,
            file_url,
        });
    }

    Ok(entries)
}

/// Returns a URL the caller can upload an attachment to.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`] for anonymous callers.
pub async fn generate_upload_url(blobs: &dyn BlobStore, ctx: &RequestContext) -> Result<String> {
    ctx.require_user()?;
    Ok(blobs.upload_url().await)
}
