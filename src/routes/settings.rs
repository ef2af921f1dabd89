/**
 * Settings Routes
 * Site settings form with profile image and CV uploads
 */
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::auth::AuthContext;
use crate::db::models::{SiteSettings, SocialLink};
use crate::errors::Error;
use crate::forms::{FieldErrors, FieldSpec, FormSpec, SettingsForm};
use crate::services;
use crate::uploads::{PendingUpload, UploadKind};
use crate::views::{flash, Flash, IncomingFlash};
use crate::AppState;

const SETTINGS_PATH: &str = "/admin/settings";

pub fn routes() -> Router<AppState> {
    Router::new().route(SETTINGS_PATH, get(settings_page).post(update_settings))
}

#[derive(Serialize)]
struct SettingsPage<'a> {
    admin: &'a str,
    fields: &'static [FieldSpec],
    form: &'a SettingsForm,
    errors: &'a FieldErrors,
    settings: SiteSettings,
    links: Vec<SocialLink>,
}

async fn render_settings(
    state: &AppState,
    auth: &AuthContext,
    status: StatusCode,
    form: Option<&SettingsForm>,
    errors: &FieldErrors,
    flash: &IncomingFlash,
) -> Response {
    let store = state.store.as_ref();
    let settings = match services::settings::get_or_create(store).await {
        Ok(settings) => settings,
        Err(e) => return e.into_response(),
    };
    let links = match store.social_links().list().await {
        Ok(links) => links,
        Err(e) => return Error::from(e).into_response(),
    };

    let current = SettingsForm::from(&settings);
    let page = SettingsPage {
        admin: &auth.username,
        fields: SettingsForm::FIELDS,
        form: form.unwrap_or(&current),
        errors,
        settings,
        links,
    };
    state
        .views
        .page(status, "admin/settings.html", &page, flash)
}

/// Split a settings submission into its text fields and the files that were attached.
///
/// File inputs left empty arrive as parts with no name or no bytes and are skipped.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(SettingsForm, Vec<PendingUpload>), Response> {
    let mut form = SettingsForm::default();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Multipart error: {}", e);
                return Err(e.into_response());
            }
        };
        let name = field.name().unwrap_or_default().to_string();

        if let Some(kind) = UploadKind::from_field(&name) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| {
                tracing::warn!("Failed to read upload bytes: {}", e);
                e.into_response()
            })?;
            if !file_name.is_empty() && !bytes.is_empty() {
                files.push(PendingUpload {
                    kind,
                    file_name,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(IntoResponse::into_response)?;
        match name.as_str() {
            "header_title" => form.header_title = value,
            "page_title" => form.page_title = value,
            "profile_name" => form.profile_name = value,
            "position" => form.position = value,
            "tagline" => form.tagline = value,
            "about_me" => form.about_me = value,
            other => tracing::debug!(field = other, "Ignoring unknown settings field"),
        }
    }

    Ok((form, files))
}

/// GET /admin/settings
pub async fn settings_page(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
) -> Response {
    render_settings(
        &state,
        &auth,
        StatusCode::OK,
        None,
        &FieldErrors::new(),
        &flash,
    )
    .await
}

/// POST /admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Response {
    let (form, files) = match read_submission(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match services::settings::update_settings(state.store.as_ref(), &state.uploads, &form, &files)
        .await
    {
        Ok(_) => flash::redirect_with(
            SETTINGS_PATH,
            Flash::success("Settings updated successfully!"),
        ),
        Err(Error::Validation(errors)) => {
            render_settings(
                &state,
                &auth,
                StatusCode::BAD_REQUEST,
                Some(&form),
                &errors,
                &IncomingFlash::default(),
            )
            .await
        }
        Err(e) => e.into_response(),
    }
}
