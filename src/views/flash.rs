//! One-shot notices carried to the next page in a short-lived cookie.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::cookies;

pub const FLASH_COOKIE: &str = "flash";

const FLASH_MAX_AGE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashLevel::Success),
            "info" => Some(FlashLevel::Info),
            "warning" => Some(FlashLevel::Warning),
            "error" => Some(FlashLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, message)
    }

    fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("level", self.level.as_str())
            .append_pair("message", &self.message)
            .finish()
    }

    fn decode(raw: &str) -> Option<Self> {
        let mut level = None;
        let mut message = None;
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "level" => level = FlashLevel::parse(&value),
                "message" => message = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            level: level?,
            message: message?,
        })
    }

    pub fn set_cookie(&self) -> String {
        // form_urlencoded output never contains ';' or whitespace
        cookies::build(
            FLASH_COOKIE,
            &self.encode(),
            Some(FLASH_MAX_AGE_SECS),
            false,
        )
    }
}

pub fn clear_cookie() -> String {
    cookies::expire(FLASH_COOKIE)
}

/// Redirect to `to`, showing `flash` on the next rendered page.
pub fn redirect_with(to: &str, flash: Flash) -> Response {
    ([(header::SET_COOKIE, flash.set_cookie())], Redirect::to(to)).into_response()
}

/// Flash message left by the previous response, if any.
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash(pub Option<Flash>);

impl<S: Send + Sync> FromRequestParts<S> for IncomingFlash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            cookies::read(&parts.headers, FLASH_COOKIE).and_then(Flash::decode),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_cookie_value_survives_special_characters() {
        let flash = Flash::success("Saved; thanks & see you=soon");
        let raw = flash.encode();
        assert!(!raw.contains(';'));
        assert_eq!(Flash::decode(&raw), Some(flash));
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        assert_eq!(Flash::decode("level=loud&message=hi"), None);
        assert_eq!(Flash::decode("nonsense"), None);
    }

    #[test]
    fn test_redirect_with_sets_cookie() {
        let response = redirect_with("/contact", Flash::info("Thanks"));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("flash=level=info&message=Thanks"));
    }
}
