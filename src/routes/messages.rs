/**
 * Message Routes
 * Admin inbox for contact form submissions
 */
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::auth::AuthContext;
use crate::db::models::ContactMessage;
use crate::routes::EntityId;
use crate::services::contact;
use crate::views::{flash, Flash, IncomingFlash};
use crate::AppState;

const INBOX_PATH: &str = "/admin/messages";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(INBOX_PATH, get(list_messages))
        .route("/admin/messages/view/{id}", get(view_message))
        .route("/admin/messages/delete/{id}", post(delete_message))
}

#[derive(Serialize)]
struct InboxPage<'a> {
    admin: &'a str,
    messages: Vec<ContactMessage>,
}

#[derive(Serialize)]
struct MessagePage<'a> {
    admin: &'a str,
    message: ContactMessage,
}

/// GET /admin/messages
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
) -> Response {
    match contact::list_messages(state.store.as_ref()).await {
        Ok(messages) => {
            let page = InboxPage {
                admin: &auth.username,
                messages,
            };
            state
                .views
                .page(StatusCode::OK, "admin/messages.html", &page, &flash)
        }
        Err(e) => e.into_response(),
    }
}

/// GET /admin/messages/view/{id} - marks the message read
pub async fn view_message(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
    EntityId(id): EntityId,
) -> Response {
    match contact::mark_as_read(state.store.as_ref(), id).await {
        Ok(message) => {
            let page = MessagePage {
                admin: &auth.username,
                message,
            };
            state
                .views
                .page(StatusCode::OK, "admin/message_view.html", &page, &flash)
        }
        Err(e) => e.into_response(),
    }
}

/// POST /admin/messages/delete/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    _auth: AuthContext,
    EntityId(id): EntityId,
) -> Response {
    match contact::delete_message(state.store.as_ref(), id).await {
        Ok(()) => flash::redirect_with(INBOX_PATH, Flash::success("Message deleted successfully!")),
        Err(e) => e.into_response(),
    }
}
