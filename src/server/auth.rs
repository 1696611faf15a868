//! Registration, login and logout.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{clear_session_cookie, session_token_from_headers, set_session_cookie, RequestContext};
use crate::security;
use crate::storage::users;

use super::view::{self, Page, ADMIN_PATH, FEED_PATH, LOGIN_PATH, LOGIN_TEMPLATE, REGISTER_TEMPLATE};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub useremail: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn duplicate_message(username: &str) -> String {
    format!("User {} is already registered.", username)
}

/// First failing rule, in the order the form is checked.
fn missing_field(form: &RegisterForm) -> Option<&'static str> {
    if form.username.is_empty() {
        Some("Username is required.")
    } else if form.password.is_empty() {
        Some("Password is required.")
    } else if form.useremail.is_empty() {
        Some("Email is required.")
    } else {
        None
    }
}

pub async fn register_form(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, Page::new(REGISTER_TEMPLATE))
}

pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let error = if let Some(msg) = missing_field(&form) {
        msg.to_string()
    } else if users::username_exists(&state.db, &form.username).await? {
        duplicate_message(&form.username)
    } else {
        let hash = security::hash_password(&form.password)?;
        match users::insert_user(&state.db, &form.username, &hash, &form.useremail).await? {
            Some(id) => {
                info!(user_id = id, username = %form.username, "account registered");
                return Ok(Redirect::to(LOGIN_PATH).into_response());
            }
            // Lost a race against a concurrent registration of the same name.
            None => duplicate_message(&form.username),
        }
    };
    warn!(username = %form.username, reason = %error, "registration rejected");
    Ok(view::render(&state, &ctx, Page::new(REGISTER_TEMPLATE).flash(error)))
}

pub async fn login_form(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, Page::new(LOGIN_TEMPLATE))
}

pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match users::find_by_username(&state.db, &form.username).await? {
        None => {
            warn!(username = %form.username, "login rejected: unknown user");
            return Ok(view::render(&state, &ctx, Page::new(LOGIN_TEMPLATE).flash("Incorrect username.")));
        }
        Some(u) if !security::verify_password(&u.password, &form.password) => {
            warn!(user_id = u.id, "login rejected: bad password");
            return Ok(view::render(&state, &ctx, Page::new(LOGIN_TEMPLATE).flash("Incorrect password.")));
        }
        Some(u) => u,
    };

    users::stamp_last_login(&state.db, user.id, &users::login_timestamp(Utc::now())).await?;
    let session = state
        .sessions
        .issue(user.id, ctx.session.as_deref())
        .map_err(|e| AppError::internal("session_error".to_string(), e.to_string()))?;
    let cookie = set_session_cookie(&session.token, state.sessions.ttl, state.cookie_secure)?;

    let dest = if user.is_admin() { ADMIN_PATH } else { FEED_PATH };
    info!(user_id = user.id, admin = user.is_admin(), "login");
    let mut resp = Redirect::to(dest).into_response();
    resp.headers_mut().insert(SET_COOKIE, cookie);
    Ok(resp)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token_from_headers(&headers) {
        if state.sessions.clear(&token) {
            info!("logout");
        }
    }
    let mut resp = Redirect::to(FEED_PATH).into_response();
    resp.headers_mut().insert(SET_COOKIE, clear_session_cookie());
    resp
}
