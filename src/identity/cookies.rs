use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};

use crate::error::{AppError, AppResult};

pub const SESSION_COOKIE: &str = "microblog_session";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie").iter() {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE)
}

pub fn set_session_cookie(token: &str, ttl: Duration, secure: bool) -> AppResult<HeaderValue> {
    let secure_attr = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE, token, ttl.as_secs(), secure_attr
    ))
    .map_err(|e| AppError::internal("cookie_error".to_string(), e.to_string()))
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "microblog_session=deleted; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
    )
}
