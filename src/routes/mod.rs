//! HTML route handlers for the public site and the admin panel.

pub mod admin;
pub mod auth;
pub mod crud;
pub mod health;
pub mod messages;
pub mod public;
pub mod settings;

use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::db::models::{Experience, Project, Skill, SocialLink, Testimonial};
use crate::errors::Error;
use crate::AppState;

/// All application routes, public and admin.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(public::routes())
        .merge(auth::routes())
        .merge(admin::routes())
        .merge(crud::routes::<Project>())
        .merge(crud::routes::<Skill>())
        .merge(crud::routes::<Testimonial>())
        .merge(crud::routes::<Experience>())
        .merge(crud::routes::<SocialLink>())
        .merge(messages::routes())
        .merge(settings::routes())
        .route("/health", get(health::health_ping))
        .route("/health/database", get(health::health_database))
        .route("/health/ready", get(health::health_ready))
}

pub async fn not_found() -> Response {
    Error::NotFound {
        resource: "Page",
        id: 0,
    }
    .into_response()
}

/// Numeric `{id}` path segment. A segment that is not a valid id gets the 404 page.
pub struct EntityId(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i32>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                tracing::debug!(path = %parts.uri.path(), "Unusable id segment: {}", rejection);
                Err(not_found().await)
            }
        }
    }
}

/// Scheme and host the browser used for this request.
pub(crate) fn request_origin(headers: &HeaderMap) -> (String, String) {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_string();
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();
    (scheme, host)
}
