//! Minimal `Cookie` / `Set-Cookie` handling for the session and flash cookies.

use axum::http::{header, HeaderMap};

/// Value of the named cookie in the request's `Cookie` headers.
pub fn read<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value for an HttpOnly, SameSite=Lax cookie scoped to the whole site.
pub fn build(name: &str, value: &str, max_age_secs: Option<i64>, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the named cookie.
pub fn expire(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_read_finds_named_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1; session=abc.def"));
        headers.append(header::COOKIE, HeaderValue::from_static("flash=x"));
        assert_eq!(read(&headers, "session"), Some("abc.def"));
        assert_eq!(read(&headers, "flash"), Some("x"));
        assert_eq!(read(&headers, "missing"), None);
    }

    #[test]
    fn test_build_flags() {
        let cookie = build("session", "t", Some(60), true);
        assert_eq!(
            cookie,
            "session=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );
        assert!(!build("session", "t", None, false).contains("Secure"));
    }
}
