//! Admin authentication: credential checks, session lifecycle and redirect safety.

pub mod password;
pub mod session;

use axum::http::HeaderMap;
use chrono::Utc;
use url::Url;

use crate::config::Config;
use crate::db::models::User;
use crate::db::Store;
use crate::errors::{Error, Result};
use crate::forms::Credentials;

pub use session::AuthContext;

/// Check a username and password against the stored users.
///
/// Unknown users and wrong passwords both yield `InvalidCredentials` after one bcrypt
/// verification each.
pub async fn verify_credentials(store: &dyn Store, credentials: &Credentials) -> Result<User> {
    let user = store
        .users()
        .find_by_username(&credentials.username)
        .await?;

    match user {
        Some(user) => {
            let ok = password::verify_password(
                credentials.password.clone(),
                user.password_hash.clone(),
            )
            .await?;
            if ok {
                Ok(user)
            } else {
                Err(Error::InvalidCredentials)
            }
        }
        None => {
            password::verify_dummy(credentials.password.clone()).await?;
            Err(Error::InvalidCredentials)
        }
    }
}

/// Verify credentials and open a session. Returns the user and the `Set-Cookie` value.
pub async fn login(
    store: &dyn Store,
    config: &Config,
    credentials: &Credentials,
) -> Result<(User, String)> {
    let user = match verify_credentials(store, credentials).await {
        Ok(user) => user,
        Err(e) => {
            if matches!(e, Error::InvalidCredentials) {
                tracing::warn!(username = %credentials.username, "Failed login attempt");
            }
            return Err(e);
        }
    };

    let now = Utc::now();
    let purged = store.sessions().purge_expired(now).await?;
    if purged > 0 {
        tracing::debug!("Purged {} expired sessions", purged);
    }

    let token = session::start(store, config, &user, now).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User logged in");
    Ok((user, session::session_cookie(&token, config)))
}

/// End the session carried by `headers`, if any. Returns the cookie-clearing value.
pub async fn logout(store: &dyn Store, config: &Config, headers: &HeaderMap) -> Result<String> {
    match session::authenticate(store, config, headers, Utc::now()).await {
        Ok(ctx) => {
            store.sessions().delete(&ctx.session_hash).await?;
            tracing::info!(user_id = ctx.user_id, "User logged out");
        }
        Err(Error::Unauthenticated) => {}
        Err(e) => return Err(e),
    }
    Ok(session::clear_session_cookie())
}

/// Whether a post-login redirect target stays on this site.
///
/// `target` is resolved against `{scheme}://{host}/`; only http(s) URLs on the same host
/// and port are accepted.
pub fn is_safe_url(target: &str, scheme: &str, host: &str) -> bool {
    if target.trim().is_empty() {
        return false;
    }
    let Ok(base) = Url::parse(&format!("{scheme}://{host}/")) else {
        return false;
    };
    match base.join(target) {
        Ok(resolved) => {
            matches!(resolved.scheme(), "http" | "https")
                && resolved.host_str() == base.host_str()
                && resolved.port_or_known_default() == base.port_or_known_default()
        }
        Err(_) => false,
    }
}
