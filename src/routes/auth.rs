/**
 * Authentication Routes
 * Admin login and logout backed by server-side sessions
 */
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{self, session};
use crate::errors::Error;
use crate::forms::{FieldErrors, FormSpec, LoginForm};
use crate::routes::request_origin;
use crate::views::{flash, Flash, IncomingFlash};
use crate::AppState;

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", get(login_page).post(login))
        .route("/admin/logout", get(logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
}

/// What the login template sees of the submitted form. The password is never echoed.
#[derive(Serialize)]
struct LoginFields<'a> {
    username: &'a str,
    next: &'a str,
}

#[derive(Serialize)]
struct LoginPage<'a> {
    form: LoginFields<'a>,
    errors: &'a FieldErrors,
    login_error: Option<&'static str>,
}

fn render_login(
    state: &AppState,
    status: StatusCode,
    username: &str,
    next: &str,
    errors: &FieldErrors,
    login_error: Option<&'static str>,
    flash: &IncomingFlash,
) -> Response {
    let page = LoginPage {
        form: LoginFields { username, next },
        errors,
        login_error,
    };
    state.views.page(status, "admin/login.html", &page, flash)
}

/// Attach an extra `Set-Cookie` header to `response`.
fn with_cookie(mut response: Response, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
    }
    response
}

/// GET /admin/login
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    flash: IncomingFlash,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session::authenticate(state.store.as_ref(), &state.config, &headers, Utc::now())
        .await
        .is_ok()
    {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    render_login(
        &state,
        StatusCode::OK,
        "",
        &query.next,
        &FieldErrors::new(),
        None,
        &flash,
    )
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return render_login(
                &state,
                StatusCode::BAD_REQUEST,
                &form.username,
                &form.next,
                &errors,
                None,
                &IncomingFlash::default(),
            )
        }
    };

    match auth::login(state.store.as_ref(), &state.config, &credentials).await {
        Ok((user, cookie)) => {
            let (scheme, host) = request_origin(&headers);
            let target = if auth::is_safe_url(&form.next, &scheme, &host) {
                form.next.as_str()
            } else {
                if !form.next.is_empty() {
                    tracing::warn!(next = %form.next, "Ignoring unsafe login redirect target");
                }
                DASHBOARD_PATH
            };
            let response = flash::redirect_with(
                target,
                Flash::success(format!("Welcome back, {}!", user.username)),
            );
            with_cookie(response, cookie)
        }
        Err(Error::InvalidCredentials) => render_login(
            &state,
            StatusCode::UNAUTHORIZED,
            &form.username,
            &form.next,
            &FieldErrors::new(),
            Some(INVALID_CREDENTIALS),
            &IncomingFlash::default(),
        ),
        Err(e) => e.into_response(),
    }
}

/// GET /admin/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match auth::logout(state.store.as_ref(), &state.config, &headers).await {
        Ok(cookie) => with_cookie(
            flash::redirect_with("/", Flash::info("You have been logged out successfully.")),
            cookie,
        ),
        Err(e) => e.into_response(),
    }
}
