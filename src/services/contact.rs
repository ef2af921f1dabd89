//! Contact form intake and the admin inbox.

use crate::db::models::{ContactMessage, MessageStatus};
use crate::db::Store;
use crate::errors::{Error, Result};
use crate::forms::{ContactForm, FormSpec};

const RESOURCE: &str = "Message";

pub async fn submit_contact_message(store: &dyn Store, form: &ContactForm) -> Result<i32> {
    let message = form.validate().map_err(Error::Validation)?;
    let id = store.messages().create(&message).await?;
    tracing::info!(id, email = %message.email, "Contact message received");
    Ok(id)
}

pub async fn list_messages(store: &dyn Store) -> Result<Vec<ContactMessage>> {
    Ok(store.messages().list().await?)
}

/// Fetch a message for display, flipping it to read on first view.
pub async fn mark_as_read(store: &dyn Store, id: i32) -> Result<ContactMessage> {
    let current = store
        .messages()
        .get(id)
        .await?
        .ok_or(Error::NotFound { resource: RESOURCE, id })?;
    if current.status == MessageStatus::Read {
        return Ok(current);
    }

    store
        .messages()
        .mark_read(id)
        .await?
        .ok_or(Error::NotFound { resource: RESOURCE, id })
}

pub async fn delete_message(store: &dyn Store, id: i32) -> Result<()> {
    if !store.messages().delete(id).await? {
        return Err(Error::NotFound { resource: RESOURCE, id });
    }
    tracing::info!(id, "Contact message deleted");
    Ok(())
}
