/**
 * Public Routes
 * Home page, project listing, contact form and CV download
 */
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::db::models::{SiteSettings, SocialLink};
use crate::db::Store;
use crate::errors::{Error, Result};
use crate::forms::{ContactForm, FieldErrors, FieldSpec, FormSpec};
use crate::services::{self, contact, home::ProjectCard};
use crate::views::{flash, Flash, IncomingFlash};
use crate::AppState;

const CONTACT_THANKS: &str =
    "Thank you! Your message has been received. I will get back to you soon.";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/projects", get(projects))
        .route("/contact", get(contact_form).post(contact_submit))
        .route("/download-cv", get(download_cv))
}

/// Settings and footer links shared by every public page.
async fn site_chrome(store: &dyn Store) -> Result<(SiteSettings, Vec<SocialLink>)> {
    let settings = services::settings::get_or_create(store).await?;
    let social_links = store.social_links().list().await?;
    Ok((settings, social_links))
}

#[derive(Serialize)]
struct ProjectsPage {
    settings: SiteSettings,
    social_links: Vec<SocialLink>,
    projects: Vec<ProjectCard>,
}

#[derive(Serialize)]
struct ContactPage<'a> {
    settings: SiteSettings,
    social_links: Vec<SocialLink>,
    fields: &'static [FieldSpec],
    form: &'a ContactForm,
    errors: &'a FieldErrors,
}

/// GET /
pub async fn index(State(state): State<AppState>, flash: IncomingFlash) -> Response {
    match services::home::home_page(state.store.as_ref()).await {
        Ok(page) => state
            .views
            .page(StatusCode::OK, "public/index.html", &page, &flash),
        Err(e) => e.into_response(),
    }
}

/// GET /projects
pub async fn projects(State(state): State<AppState>, flash: IncomingFlash) -> Response {
    let store = state.store.as_ref();
    let page = async {
        let (settings, social_links) = site_chrome(store).await?;
        let projects = services::home::all_projects(store).await?;
        Ok::<_, Error>(ProjectsPage {
            settings,
            social_links,
            projects,
        })
    };
    match page.await {
        Ok(page) => state
            .views
            .page(StatusCode::OK, "public/projects.html", &page, &flash),
        Err(e) => e.into_response(),
    }
}

async fn render_contact(
    state: &AppState,
    status: StatusCode,
    form: &ContactForm,
    errors: &FieldErrors,
    flash: &IncomingFlash,
) -> Response {
    let (settings, social_links) = match site_chrome(state.store.as_ref()).await {
        Ok(chrome) => chrome,
        Err(e) => return e.into_response(),
    };
    let page = ContactPage {
        settings,
        social_links,
        fields: ContactForm::FIELDS,
        form,
        errors,
    };
    state
        .views
        .page(status, "public/contact.html", &page, flash)
}

/// GET /contact
pub async fn contact_form(State(state): State<AppState>, flash: IncomingFlash) -> Response {
    render_contact(
        &state,
        StatusCode::OK,
        &ContactForm::default(),
        &FieldErrors::new(),
        &flash,
    )
    .await
}

/// POST /contact
pub async fn contact_submit(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Response {
    match contact::submit_contact_message(state.store.as_ref(), &form).await {
        Ok(_) => flash::redirect_with("/contact", Flash::success(CONTACT_THANKS)),
        Err(Error::Validation(errors)) => {
            render_contact(
                &state,
                StatusCode::BAD_REQUEST,
                &form,
                &errors,
                &IncomingFlash::default(),
            )
            .await
        }
        Err(e) => e.into_response(),
    }
}

/// GET /download-cv
pub async fn download_cv(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let settings = match services::settings::get_or_create(state.store.as_ref()).await {
        Ok(settings) => settings,
        Err(e) => return e.into_response(),
    };
    let Some(name) = settings.cv_filename else {
        return flash::redirect_with("/", Flash::error("CV not available."));
    };

    let Some(path) = state
        .uploads
        .find_document(&state.config.static_dir, &name)
        .await
    else {
        tracing::warn!(file = %name, "CV file is missing on disk");
        return flash::redirect_with("/", Flash::error("CV file not found."));
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cv.pdf".to_string());
    let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
    else {
        tracing::error!(file = %file_name, "CV file name is not a valid header value");
        return Error::internal("serve CV").into_response();
    };

    // Range and conditional headers pass through to the file service.
    let mut request = Request::new(Body::empty());
    *request.headers_mut() = headers;
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        tracing::warn!(file = %path.display(), "CV file disappeared before it was served");
        return flash::redirect_with("/", Flash::error("CV file not found."));
    }

    let mut response = response.map(Body::new);
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    response_headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}
