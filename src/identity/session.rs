use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: i64,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    flashes: Vec<String>,
}

type FillFn = fn(&mut [u8]) -> Result<(), getrandom::Error>;

// 256-bit random token, base64url without padding
fn gen_token(fill: FillFn) -> Result<SessionToken, getrandom::Error> {
    let mut buf = [0u8; 32];
    fill(&mut buf)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Server-side session table. Owned by the application state; one per server.
#[derive(Debug)]
pub struct SessionManager {
    pub ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, SessionEntry>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::new(Duration::from_secs(24 * 60 * 60)) }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()) }
    }

    /// Start a fresh session for `user_id`. If `previous` names a live session it
    /// is dropped first, so a login never inherits an earlier identity.
    /// Fails, leaving the table untouched, when the OS RNG is unavailable.
    pub fn issue(&self, user_id: i64, previous: Option<&str>) -> Result<Session, getrandom::Error> {
        self.issue_with(user_id, previous, getrandom::getrandom)
    }

    fn issue_with(&self, user_id: i64, previous: Option<&str>, fill: FillFn) -> Result<Session, getrandom::Error> {
        let token = gen_token(fill)?;
        let now = Instant::now();
        let sess = Session {
            token,
            user_id,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        let mut map = self.sessions.write();
        if let Some(old) = previous {
            map.remove(old);
        }
        map.insert(sess.token.clone(), SessionEntry { session: sess.clone(), flashes: Vec::new() });
        tracing::debug!(user_id, ttl_secs = self.ttl.as_secs(), "session.issue");
        Ok(sess)
    }

    /// User id bound to a live session. Expired entries are dropped on sight.
    pub fn validate(&self, token: &str) -> Option<i64> {
        let now = Instant::now();
        let mut expired = false;
        let out = {
            let map = self.sessions.read();
            match map.get(token) {
                Some(ent) if ent.session.expires_at > now => Some(ent.session.user_id),
                Some(_) => { expired = true; None }
                None => None,
            }
        };
        if expired {
            self.sessions.write().remove(token);
        }
        out
    }

    pub fn clear(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// Queue a one-shot message for the next rendered page of this session.
    pub fn flash(&self, token: &str, message: impl Into<String>) -> bool {
        match self.sessions.write().get_mut(token) {
            Some(ent) => { ent.flashes.push(message.into()); true }
            None => false,
        }
    }

    pub fn take_flashes(&self, token: &str) -> Vec<String> {
        match self.sessions.write().get_mut(token) {
            Some(ent) => std::mem::take(&mut ent.flashes),
            None => Vec::new(),
        }
    }

    /// Drop every expired session; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, ent| ent.session.expires_at > now);
        before - map.len()
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }
}
