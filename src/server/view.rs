//! View rendering seam.
//!
//! Handlers never build markup. They produce a `Page` (template name, context
//! data, flash messages) which is serialized as JSON for the templating layer.
//! Rendering drains the session's pending flashes, so a message queued before a
//! redirect shows up on the next rendered page and only there.

use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::identity::RequestContext;
use crate::storage::UserProfile;

use super::AppState;

pub const REGISTER_TEMPLATE: &str = "auth/register.html";
pub const LOGIN_TEMPLATE: &str = "auth/login.html";
pub const EDIT_TEMPLATE: &str = "auth/edit.html";
pub const FOLLOWING_TEMPLATE: &str = "auth/following.html";
pub const FOLLOWERS_TEMPLATE: &str = "auth/followers.html";
pub const ADMIN_INDEX_TEMPLATE: &str = "admin/index.html";
pub const ADMIN_USERS_TEMPLATE: &str = "admin/users.html";
pub const ADMIN_POSTS_TEMPLATE: &str = "admin/posts.html";
pub const INDEX_TEMPLATE: &str = "index.html";

pub const FEED_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/auth/login";
pub const ADMIN_PATH: &str = "/auth/admin";

pub fn profile_path(user_id: i64) -> String { format!("/profile/{}", user_id) }

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub template: &'static str,
    pub user: Option<UserProfile>,
    pub flashes: Vec<String>,
    pub data: serde_json::Value,
}

impl Page {
    pub fn new(template: &'static str) -> Self {
        Self { template, user: None, flashes: Vec::new(), data: serde_json::json!({}) }
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn flash(mut self, message: impl Into<String>) -> Self {
        self.flashes.push(message.into());
        self
    }
}

/// Attach the current user and pending flashes, then serialize.
pub fn render(state: &AppState, ctx: &RequestContext, mut page: Page) -> Response {
    page.user = ctx.user.as_ref().map(|u| u.profile());
    if let Some(token) = ctx.session.as_deref() {
        let mut pending = state.sessions.take_flashes(token);
        pending.append(&mut page.flashes);
        page.flashes = pending;
    }
    Json(page).into_response()
}

/// Queue a flash on the caller's session (if any) and redirect.
pub fn flash_and_redirect(state: &AppState, ctx: &RequestContext, message: &str, to: &str) -> Response {
    if let Some(token) = ctx.session.as_deref() {
        state.sessions.flash(token, message);
    }
    Redirect::to(to).into_response()
}
