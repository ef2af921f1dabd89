//! Browser sessions: a signed JWT cookie that points at a server-side session row.
//!
//! The cookie alone is not enough to authenticate. The `sid` claim is hashed and looked up
//! in the store, so deleting the row on logout revokes the token immediately.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::cookies;
use crate::db::models::{NewSession, User};
use crate::db::Store;
use crate::errors::{Error, Result, LOGIN_PATH};
use crate::AppState;

pub const SESSION_COOKIE: &str = "portfolio_session";

const SESSION_ID_LEN: usize = 64;

/// JWT session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i32,         // User ID
    pub username: String, // Username
    pub sid: String,      // Session id, stored hashed server-side
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
}

/// Identity of the admin making the request. Taking this as a handler argument is what
/// makes a route admin-only.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i32,
    pub username: String,
    pub session_hash: String,
}

pub fn new_session_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LEN)
}

pub fn hash_session_id(sid: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sid.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn encode_token(claims: &SessionClaims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::internal(format!("create session token: {e}")))
}

/// Decode and verify a session token. Any signature or expiry failure is `Unauthenticated`.
pub fn decode_token(token: &str, secret: &str) -> Result<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        Error::Unauthenticated
    })
}

/// Persist a new session for `user` and return the signed cookie value.
pub async fn start(
    store: &dyn Store,
    config: &Config,
    user: &User,
    now: DateTime<Utc>,
) -> Result<String> {
    let sid = new_session_id();
    let expires_at = now + config.session_lifetime;

    store
        .sessions()
        .create(&NewSession {
            token_hash: hash_session_id(&sid),
            user_id: user.id,
            expires_at,
        })
        .await?;

    let claims = SessionClaims {
        sub: user.id,
        username: user.username.clone(),
        sid,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };
    encode_token(&claims, &config.session_secret)
}

/// Resolve the session cookie in `headers` to an active session.
pub async fn authenticate(
    store: &dyn Store,
    config: &Config,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<AuthContext> {
    let token = cookies::read(headers, SESSION_COOKIE).ok_or(Error::Unauthenticated)?;
    let claims = decode_token(token, &config.session_secret)?;
    let session_hash = hash_session_id(&claims.sid);

    let session = store
        .sessions()
        .find_active(&session_hash, now)
        .await?
        .ok_or(Error::Unauthenticated)?;
    if session.user_id != claims.sub {
        return Err(Error::Unauthenticated);
    }

    Ok(AuthContext {
        user_id: claims.sub,
        username: claims.username,
        session_hash,
    })
}

pub fn session_cookie(token: &str, config: &Config) -> String {
    cookies::build(
        SESSION_COOKIE,
        token,
        Some(config.session_lifetime.num_seconds()),
        config.is_production(),
    )
}

pub fn clear_session_cookie() -> String {
    cookies::expire(SESSION_COOKIE)
}

/// Login page URL that returns to `path_and_query` afterwards.
pub fn login_redirect_target(path_and_query: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(path_and_query.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={next}")
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match authenticate(
            state.store.as_ref(),
            &state.config,
            &parts.headers,
            Utc::now(),
        )
        .await
        {
            Ok(ctx) => Ok(ctx),
            Err(Error::Unauthenticated) => {
                let original = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                tracing::debug!("Unauthenticated request to {}", original);
                Err(Redirect::to(&login_redirect_target(original)).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use axum::http::{header, HeaderValue};
    use chrono::Duration;

    fn config() -> Config {
        Config::from_lookup(|name| match name {
            "SESSION_SECRET" => Some("test-secret".to_string()),
            "DATABASE_URL" => Some("memory://".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}")).unwrap(),
        );
        headers
    }

    async fn user(store: &MemoryStore) -> User {
        store.users().create("admin", "hash").await.unwrap()
    }

    #[test]
    fn test_session_ids_are_random() {
        let a = new_session_id();
        assert_eq!(a.len(), SESSION_ID_LEN);
        assert_ne!(a, new_session_id());
        assert_eq!(hash_session_id(&a).len(), 64);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let claims = SessionClaims {
            sub: 1,
            username: "admin".to_string(),
            sid: "abc".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode_token(&claims, "one").unwrap();
        assert_eq!(decode_token(&token, "one").unwrap().sub, 1);
        assert!(matches!(
            decode_token(&token, "two"),
            Err(Error::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_started_session_authenticates() {
        let store = MemoryStore::new();
        let config = config();
        let user = user(&store).await;
        let now = Utc::now();

        let token = start(&store, &config, &user, now).await.unwrap();
        let ctx = authenticate(&store, &config, &cookie_headers(&token), now)
            .await
            .unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.username, "admin");
    }

    #[tokio::test]
    async fn test_deleted_session_no_longer_authenticates() {
        let store = MemoryStore::new();
        let config = config();
        let user = user(&store).await;
        let now = Utc::now();

        let token = start(&store, &config, &user, now).await.unwrap();
        let ctx = authenticate(&store, &config, &cookie_headers(&token), now)
            .await
            .unwrap();
        store.sessions().delete(&ctx.session_hash).await.unwrap();

        assert!(matches!(
            authenticate(&store, &config, &cookie_headers(&token), now).await,
            Err(Error::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_session_expires_after_lifetime() {
        let store = MemoryStore::new();
        let config = config();
        let user = user(&store).await;
        let issued = Utc::now() - Duration::hours(1);

        let token = start(&store, &config, &user, issued).await.unwrap();
        let later = issued + config.session_lifetime + Duration::seconds(1);
        assert!(matches!(
            authenticate(&store, &config, &cookie_headers(&token), later).await,
            Err(Error::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthenticated() {
        let store = MemoryStore::new();
        assert!(matches!(
            authenticate(&store, &config(), &HeaderMap::new(), Utc::now()).await,
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_login_redirect_keeps_original_target() {
        assert_eq!(
            login_redirect_target("/admin/projects?page=2"),
            "/admin/login?next=%2Fadmin%2Fprojects%3Fpage%3D2"
        );
    }
}
