/**
 * Admin Routes
 * Dashboard landing page
 */
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::auth::AuthContext;
use crate::db::models::DashboardCounts;
use crate::routes::auth::DASHBOARD_PATH;
use crate::services;
use crate::views::IncomingFlash;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_index))
        .route(DASHBOARD_PATH, get(dashboard))
}

#[derive(Serialize)]
struct DashboardPage<'a> {
    admin: &'a str,
    counts: DashboardCounts,
}

/// GET /admin
pub async fn admin_index(_auth: AuthContext) -> Redirect {
    Redirect::to(DASHBOARD_PATH)
}

/// GET /admin/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
) -> Response {
    match services::dashboard_counts(state.store.as_ref()).await {
        Ok(counts) => {
            let page = DashboardPage {
                admin: &auth.username,
                counts,
            };
            state
                .views
                .page(StatusCode::OK, "admin/dashboard.html", &page, &flash)
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewContactMessage;
    use crate::test_utils::{body_string, get, get_with_cookie, location, login, test_app};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_admin_root_goes_to_dashboard() {
        let (app, _ctx) = test_app().await;
        let cookie = login(&app).await;
        let res = app
            .oneshot(get_with_cookie("/admin", &cookie))
            .await
            .unwrap();
        assert_eq!(location(&res), DASHBOARD_PATH);
    }

    #[tokio::test]
    async fn test_dashboard_requires_login() {
        let (app, _ctx) = test_app().await;
        let res = app.oneshot(get(DASHBOARD_PATH)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin/login?next=%2Fadmin%2Fdashboard");
    }

    #[tokio::test]
    async fn test_dashboard_shows_counts() {
        let (app, ctx) = test_app().await;
        ctx.state
            .store
            .messages()
            .create(&NewContactMessage {
                name: "Jo".to_string(),
                email: "jo@example.com".to_string(),
                subject: "Hi".to_string(),
                message: "Hello there, Jo here".to_string(),
            })
            .await
            .unwrap();
        let cookie = login(&app).await;

        let res = app
            .oneshot(get_with_cookie(DASHBOARD_PATH, &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("Unread messages"));
        assert!(body.contains("Log out (admin)"));
    }
}
