//! Admin pages. Mounted behind `require_admin`.

use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use serde_json::json;

use crate::error::AppResult;
use crate::identity::RequestContext;
use crate::storage::{users, UserProfile};

use super::view::{self, Page, ADMIN_INDEX_TEMPLATE, ADMIN_POSTS_TEMPLATE, ADMIN_USERS_TEMPLATE};
use super::AppState;

pub async fn admin_dashboard(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, Page::new(ADMIN_INDEX_TEMPLATE))
}

pub async fn list_users(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> AppResult<Response> {
    let all: Vec<UserProfile> = users::list_all(&state.db).await?.iter().map(|u| u.profile()).collect();
    Ok(view::render(&state, &ctx, Page::new(ADMIN_USERS_TEMPLATE).data(json!({ "users": all }))))
}

pub async fn list_posts(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, Page::new(ADMIN_POSTS_TEMPLATE))
}
