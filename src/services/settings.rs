//! Site settings singleton and the uploads attached to it.

use crate::db::models::{SettingsUpdate, SiteSettings};
use crate::db::Store;
use crate::errors::{Error, Result};
use crate::forms::{FieldErrors, FormSpec, SettingsForm};
use crate::uploads::{PendingUpload, UploadKind, UploadStore};

pub async fn get_or_create(store: &dyn Store) -> Result<SiteSettings> {
    Ok(store.settings().get_or_create().await?)
}

/// Validate the settings form and any uploads, then store files and the row.
///
/// Nothing is written unless the text fields and every upload pass validation.
pub async fn update_settings(
    store: &dyn Store,
    uploads: &UploadStore,
    form: &SettingsForm,
    files: &[PendingUpload],
) -> Result<SiteSettings> {
    let current = get_or_create(store).await?;

    let mut errors = FieldErrors::new();
    let text = match form.validate() {
        Ok(text) => Some(text),
        Err(e) => {
            errors.merge(e);
            None
        }
    };
    for file in files {
        match uploads.check(file) {
            Ok(()) => {}
            Err(Error::Validation(e)) => errors.merge(e),
            Err(e @ Error::UnsupportedFileType { .. }) => {
                let field = file.kind.field();
                errors.add(field, e.user_message());
            }
            Err(e) => return Err(e),
        }
    }
    let text = match text {
        Some(text) if errors.is_empty() => text,
        _ => return Err(Error::Validation(errors)),
    };

    let mut update = SettingsUpdate {
        header_title: text.header_title.unwrap_or(current.header_title),
        page_title: text.page_title.unwrap_or(current.page_title),
        profile_name: text.profile_name,
        position: text.position,
        tagline: text.tagline,
        about_me: text.about_me,
        profile_image: None,
        cv_filename: None,
    };
    for file in files {
        let stored = uploads.save(file).await?;
        match file.kind {
            UploadKind::ProfileImage => update.profile_image = Some(stored.recorded_as),
            UploadKind::Cv => update.cv_filename = Some(stored.recorded_as),
        }
    }

    let settings = store.settings().update(&update).await?;
    tracing::info!("Site settings updated");
    Ok(settings)
}
