//! Session gate: identity loading and route guards.
//!
//! `load_identity` wraps the whole router and runs before every handler.
//! `require_login` / `require_admin` are `route_layer`s on the protected
//! sub-routers, so they only see requests that already carry a `RequestContext`.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::{session_token_from_headers, RequestContext, SessionManager};
use crate::storage::{users, Db};

use super::view::LOGIN_PATH;
use super::AppState;

/// Resolve the session cookie into a context. Unknown or expired tokens and
/// ids of users that no longer exist all yield an anonymous context.
pub async fn resolve_context(sessions: &SessionManager, db: &Db, headers: &HeaderMap) -> AppResult<RequestContext> {
    let Some(token) = session_token_from_headers(headers) else { return Ok(RequestContext::anonymous()) };
    let Some(user_id) = sessions.validate(&token) else { return Ok(RequestContext::anonymous()) };
    match users::find_by_id(db, user_id).await? {
        Some(user) => Ok(RequestContext { user: Some(user), session: Some(token) }),
        None => {
            debug!(user_id, "session refers to a missing user");
            Ok(RequestContext::anonymous())
        }
    }
}

pub async fn load_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ctx = match resolve_context(&state.sessions, &state.db, req.headers()).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

fn context_of(req: &Request) -> Option<&RequestContext> {
    req.extensions().get::<RequestContext>()
}

pub async fn require_login(req: Request, next: Next) -> Response {
    if !context_of(&req).map(|c| c.is_authenticated()).unwrap_or(false) {
        debug!(path = %req.uri().path(), "anonymous request redirected to login");
        return Redirect::to(LOGIN_PATH).into_response();
    }
    next.run(req).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    let Some(user) = context_of(&req).and_then(|c| c.user.as_ref()) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    if !user.is_admin() {
        tracing::warn!(user_id = user.id, path = %req.uri().path(), "non-admin denied");
        return AppError::forbidden("admin_required", "administrator role required").into_response();
    }
    next.run(req).await
}
