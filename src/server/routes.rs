//! HTTP route handlers for the chat UI.
//!
//! Every form action answers with a redirect back to the page, anchored at
//! the newest message.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Form, Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::chat::errors::ChatError;
use crate::chat::ids::ConversationId;
use crate::chat::session::{EditKey, Event};
use crate::render::LATEST_ANCHOR;

use super::state::{AppState, StateSnapshot};

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/state", get(state_snapshot))
        .route("/conversations", post(new_conversation))
        .route("/conversations/{id}/select", post(select_conversation))
        .route("/conversations/{id}/delete", post(request_delete))
        .route("/conversations/{id}/delete/confirm", post(confirm_delete))
        .route("/delete/dismiss", post(dismiss_delete))
        .route("/conversations/{id}/edit", post(start_edit))
        .route("/conversations/{id}/edit/cancel", post(cancel_edit))
        .route("/conversations/{id}/edit/key", post(edit_key))
        .route("/conversations/{id}/rename", post(rename_conversation))
        .route("/conversations/{id}/stop", post(stop_reply))
        .route("/messages", post(submit_message))
        .route("/sidebar/toggle", post(toggle_sidebar))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            Self::ReplyPending(_) | Self::DeleteNotConfirmed(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

type ActionResult = Result<Redirect, ChatError>;

fn back_to_latest() -> Redirect {
    Redirect::to(&format!("/#{LATEST_ANCHOR}"))
}

async fn apply(state: &Arc<AppState>, event: Event) -> ActionResult {
    state.dispatch(event).await?;
    Ok(back_to_latest())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "parley",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Query of the page route.
#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    /// Viewport width reported by the browser on first load.
    pub viewport: Option<u32>,
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, ChatError> {
    if let Some(width) = query.viewport {
        state.dispatch(Event::ViewportMeasured(width)).await?;
    }
    Ok(Html(state.render().await))
}

async fn state_snapshot(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    Json(state.snapshot().await)
}

async fn new_conversation(State(state): State<Arc<AppState>>) -> ActionResult {
    apply(&state, Event::NewConversation).await
}

async fn select_conversation(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    apply(&state, Event::Select(id)).await
}

async fn request_delete(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    apply(&state, Event::RequestDelete(id)).await
}

async fn confirm_delete(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    apply(&state, Event::ConfirmDelete(id)).await
}

async fn dismiss_delete(State(state): State<Arc<AppState>>) -> ActionResult {
    apply(&state, Event::DismissDelete).await
}

async fn start_edit(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    apply(&state, Event::StartEdit(id)).await
}

async fn cancel_edit(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    apply(&state, Event::CancelEdit(id)).await
}

/// Inline editor submission.
#[derive(Debug, Deserialize)]
pub struct RenameForm {
    /// Raw field value.
    #[serde(default)]
    pub title: String,
}

async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
    Form(form): Form<RenameForm>,
) -> ActionResult {
    apply(&state, Event::ConfirmEdit { id, title: form.title }).await
}

/// Key pressed in the inline editor.
#[derive(Debug, Deserialize)]
pub struct EditKeyForm {
    /// DOM key name.
    pub key: String,
    /// Raw field value.
    #[serde(default)]
    pub title: String,
}

async fn edit_key(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
    Form(form): Form<EditKeyForm>,
) -> ActionResult {
    let event = Event::EditKey {
        id,
        key: EditKey::parse(&form.key),
        title: form.title,
    };
    apply(&state, event).await
}

async fn stop_reply(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<ConversationId>,
) -> ActionResult {
    state.stop(id).await?;
    Ok(back_to_latest())
}

/// Composer submission.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    /// Prompt text.
    #[serde(default)]
    pub prompt: String,
}

async fn submit_message(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> ActionResult {
    apply(&state, Event::Submit(form.prompt)).await
}

async fn toggle_sidebar(State(state): State<Arc<AppState>>) -> ActionResult {
    apply(&state, Event::ToggleSidebar).await
}
