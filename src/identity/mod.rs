//! Session management and per-request identity.
//! Keep the public surface thin and split implementation across sub-modules.

mod cookies;
mod request_context;
mod session;

pub use cookies::{clear_session_cookie, parse_cookie, session_token_from_headers, set_session_cookie, SESSION_COOKIE};
pub use request_context::RequestContext;
pub use session::{Session, SessionManager, SessionToken};
