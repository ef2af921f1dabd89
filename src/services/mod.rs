//! Content operations shared by the admin and public handlers.
//!
//! Every mutation validates first and then issues a single store call, so a failed
//! validation leaves the store untouched.

pub mod contact;
pub mod home;
pub mod settings;

use crate::db::models::{DashboardCounts, Entity};
use crate::db::{Repository, Store};
use crate::errors::{Error, Result};
use crate::forms::FormSpec;

pub async fn list<E: Entity>(repo: &dyn Repository<E>) -> Result<Vec<E>> {
    Ok(repo.list().await?)
}

pub async fn get<E: Entity>(repo: &dyn Repository<E>, id: i32) -> Result<E> {
    repo.get(id).await?.ok_or(Error::NotFound {
        resource: E::RESOURCE,
        id,
    })
}

pub async fn create<E, F>(repo: &dyn Repository<E>, form: &F) -> Result<i32>
where
    E: Entity,
    F: FormSpec<Output = E::Input>,
{
    let input = form.validate().map_err(Error::Validation)?;
    let id = repo.create(&input).await?;
    tracing::info!(resource = E::RESOURCE, id, "Created");
    Ok(id)
}

/// Overwrite an existing row. Missing rows are reported before the form is validated.
pub async fn update<E, F>(repo: &dyn Repository<E>, id: i32, form: &F) -> Result<()>
where
    E: Entity,
    F: FormSpec<Output = E::Input>,
{
    get(repo, id).await?;
    let input = form.validate().map_err(Error::Validation)?;
    if !repo.update(id, &input).await? {
        return Err(Error::NotFound {
            resource: E::RESOURCE,
            id,
        });
    }
    tracing::info!(resource = E::RESOURCE, id, "Updated");
    Ok(())
}

pub async fn delete<E: Entity>(repo: &dyn Repository<E>, id: i32) -> Result<()> {
    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: E::RESOURCE,
            id,
        });
    }
    tracing::info!(resource = E::RESOURCE, id, "Deleted");
    Ok(())
}

pub async fn dashboard_counts(store: &dyn Store) -> Result<DashboardCounts> {
    Ok(DashboardCounts {
        projects: store.projects().count().await?,
        skills: store.skills().count().await?,
        testimonials: store.testimonials().count().await?,
        experiences: store.experiences().count().await?,
        unread_messages: store.messages().count_unread().await?,
        total_messages: store.messages().count().await?,
    })
}
