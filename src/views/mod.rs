//! Server-rendered HTML pages.
//!
//! Templates are compiled into the binary and rendered with minijinja. `.html` templates
//! are auto-escaped.

pub mod flash;

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use minijinja::Environment;
use serde::Serialize;

use crate::errors::{Error, Result};
pub use flash::{Flash, FlashLevel, IncomingFlash};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("_field.html", include_str!("../../templates/_field.html")),
    (
        "public/index.html",
        include_str!("../../templates/public/index.html"),
    ),
    (
        "public/projects.html",
        include_str!("../../templates/public/projects.html"),
    ),
    (
        "public/contact.html",
        include_str!("../../templates/public/contact.html"),
    ),
    (
        "admin/login.html",
        include_str!("../../templates/admin/login.html"),
    ),
    (
        "admin/dashboard.html",
        include_str!("../../templates/admin/dashboard.html"),
    ),
    (
        "admin/list.html",
        include_str!("../../templates/admin/list.html"),
    ),
    (
        "admin/form.html",
        include_str!("../../templates/admin/form.html"),
    ),
    (
        "admin/messages.html",
        include_str!("../../templates/admin/messages.html"),
    ),
    (
        "admin/message_view.html",
        include_str!("../../templates/admin/message_view.html"),
    ),
    (
        "admin/settings.html",
        include_str!("../../templates/admin/settings.html"),
    ),
];

#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> std::result::Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(*name, *source)?;
        }
        Ok(Self { env })
    }

    /// Render `name` with the fields of `ctx` plus the pending flash message.
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        ctx: &S,
        flash: Option<&Flash>,
    ) -> Result<String> {
        let mut value = serde_json::to_value(ctx).map_err(|e| {
            tracing::error!("Failed to serialize context for {}: {}", name, e);
            Error::internal("render page")
        })?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "flash".to_string(),
                serde_json::to_value(flash).unwrap_or(serde_json::Value::Null),
            );
        }

        let template = self.env.get_template(name).map_err(|e| {
            tracing::error!("Unknown template {}: {}", name, e);
            Error::internal("render page")
        })?;
        template.render(&value).map_err(|e| {
            tracing::error!("Failed to render {}: {:#}", name, e);
            Error::internal("render page")
        })
    }

    /// Render a full page response. A flash that was read for this request is cleared.
    pub fn page<S: Serialize>(
        &self,
        status: StatusCode,
        name: &str,
        ctx: &S,
        flash: &IncomingFlash,
    ) -> Response {
        match self.render(name, ctx, flash.0.as_ref()) {
            Ok(html) => {
                let mut response = (status, Html(html)).into_response();
                if flash.0.is_some() {
                    if let Ok(value) = flash::clear_cookie().parse() {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                }
                response
            }
            Err(e) => e.into_response(),
        }
    }
}
