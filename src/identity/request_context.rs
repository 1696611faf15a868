use crate::error::{AppError, AppResult};
use crate::storage::UserRecord;

use super::session::SessionToken;

/// Per-request identity, built once by the gate middleware and handed to
/// handlers as an `Extension<RequestContext>`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<UserRecord>,
    /// Token of the live session the user was loaded from.
    pub session: Option<SessionToken>,
}

impl RequestContext {
    pub fn anonymous() -> Self { Self::default() }

    pub fn is_authenticated(&self) -> bool { self.user.is_some() }

    pub fn user_id(&self) -> Option<i64> { self.user.as_ref().map(|u| u.id) }

    /// The logged-in user, for handlers that sit behind `require_login`.
    pub fn require_user(&self) -> AppResult<&UserRecord> {
        self.user.as_ref().ok_or_else(|| AppError::auth("login_required", "login required"))
    }
}
