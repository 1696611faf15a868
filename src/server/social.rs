//! Follow graph endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::storage::{follows, users, UserProfile, UserRecord};

use super::view::{self, profile_path, Page, FOLLOWERS_TEMPLATE, FOLLOWING_TEMPLATE};
use super::AppState;

fn profiles(rows: Vec<UserRecord>) -> Vec<UserProfile> {
    rows.iter().map(UserRecord::profile).collect()
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(target): Path<i64>,
) -> AppResult<Response> {
    let actor = ctx.require_user()?;
    if actor.id == target {
        return Ok(view::flash_and_redirect(&state, &ctx, "You cannot follow yourself.", &profile_path(target)));
    }
    if users::find_by_id(&state.db, target).await?.is_none() {
        return Err(AppError::not_found("user_not_found".to_string(), format!("user {} not found", target)));
    }
    if follows::follow(&state.db, actor.id, target).await? {
        info!(follower = actor.id, followed = target, "follow");
    } else {
        debug!(follower = actor.id, followed = target, "already following");
    }
    Ok(Redirect::to(&profile_path(target)).into_response())
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(target): Path<i64>,
) -> AppResult<Response> {
    let actor = ctx.require_user()?;
    if follows::unfollow(&state.db, actor.id, target).await? {
        info!(follower = actor.id, followed = target, "unfollow");
    }
    Ok(Redirect::to(&profile_path(target)).into_response())
}

/// Counts plus whether the viewer follows `user_id`, shared by both listings.
async fn graph_summary(state: &AppState, ctx: &RequestContext, user_id: i64) -> AppResult<serde_json::Value> {
    let counts = follows::counts(&state.db, user_id).await?;
    let viewer_follows = match ctx.user_id() {
        Some(viewer) if viewer != user_id => follows::is_following(&state.db, viewer, user_id).await?,
        _ => false,
    };
    Ok(json!({ "counts": counts, "viewer_follows": viewer_follows }))
}

pub async fn following(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    let rows = follows::following(&state.db, user_id).await?;
    let mut data = graph_summary(&state, &ctx, user_id).await?;
    data["user_id"] = json!(user_id);
    data["follows"] = json!(profiles(rows));
    Ok(view::render(&state, &ctx, Page::new(FOLLOWING_TEMPLATE).data(data)))
}

pub async fn followers(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    let rows = follows::followers(&state.db, user_id).await?;
    let mut data = graph_summary(&state, &ctx, user_id).await?;
    data["user_id"] = json!(user_id);
    data["followers"] = json!(profiles(rows));
    Ok(view::render(&state, &ctx, Page::new(FOLLOWERS_TEMPLATE).data(data)))
}
