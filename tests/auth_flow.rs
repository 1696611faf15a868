//! Registration, login and logout over HTTP.

mod common;

use anyhow::Result;
use common::{client, flashes, location, spawn};
use microblog::storage::users;

#[tokio::test]
async fn register_stores_hash_and_redirects_to_login() -> Result<()> {
    let srv = spawn().await?;
    let c = client();

    let resp = srv.register(&c, "alice", "hunter2", "alice@example.com").await?;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/auth/login"));

    let alice = srv.user("alice").await?;
    assert_ne!(alice.password, "hunter2");
    assert!(alice.password.starts_with("$argon2"));
    assert_eq!(alice.useremail.as_deref(), Some("alice@example.com"));
    assert!(alice.last_login.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_rejected_without_a_second_row() -> Result<()> {
    let srv = spawn().await?;
    let c = client();
    srv.register(&c, "alice", "pw", "a@example.com").await?;

    let resp = srv.register(&c, "alice", "other", "b@example.com").await?;
    assert_eq!(resp.status(), 200);
    let page: serde_json::Value = resp.json().await?;
    assert_eq!(page["template"], "auth/register.html");
    assert_eq!(flashes(&page), vec!["User alice is already registered.".to_string()]);
    assert_eq!(users::count(srv.db()).await?, 1);
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_reported_in_order() -> Result<()> {
    let srv = spawn().await?;
    let c = client();

    let page: serde_json::Value = srv.register(&c, "", "", "").await?.json().await?;
    assert_eq!(flashes(&page), vec!["Username is required.".to_string()]);
    let page: serde_json::Value = srv.register(&c, "bob", "pw", "").await?.json().await?;
    assert_eq!(flashes(&page), vec!["Email is required.".to_string()]);
    assert_eq!(users::count(srv.db()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn login_sets_session_and_stamps_last_login() -> Result<()> {
    let srv = spawn().await?;
    let c = client();
    srv.register(&c, "alice", "pw", "a@example.com").await?;

    let before = chrono::Utc::now();
    let resp = srv.login(&c, "alice", "pw").await?;
    let after = chrono::Utc::now();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/"));
    assert!(resp.headers().get("set-cookie").is_some());
    assert_eq!(srv.state.sessions.len(), 1);

    let alice = srv.user("alice").await?;
    let stamp = alice.last_login.expect("last_login stamped");
    let at = chrono::DateTime::parse_from_rfc3339(&stamp)?;
    // Eastern time, standard or daylight.
    assert!(matches!(at.offset().local_minus_utc(), -18_000 | -14_400), "offset of {}", stamp);
    // RFC 3339 keeps sub-second precision, so the bounds are exact.
    assert!(at >= before && at <= after, "{} not within login request", stamp);

    let page = srv.view(&c, "/").await?;
    assert_eq!(page["template"], "index.html");
    assert_eq!(page["user"]["username"], "alice");
    assert!(page["user"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn bad_credentials_leave_no_session() -> Result<()> {
    let srv = spawn().await?;
    let c = client();
    srv.register(&c, "alice", "pw", "a@example.com").await?;

    let resp = srv.login(&c, "alice", "wrong").await?;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("set-cookie").is_none());
    let page: serde_json::Value = resp.json().await?;
    assert_eq!(flashes(&page), vec!["Incorrect password.".to_string()]);

    let page: serde_json::Value = srv.login(&c, "nobody", "pw").await?.json().await?;
    assert_eq!(flashes(&page), vec!["Incorrect username.".to_string()]);

    assert!(srv.state.sessions.is_empty());
    assert!(srv.user("alice").await?.last_login.is_none());
    Ok(())
}

#[tokio::test]
async fn admin_login_lands_on_admin_page() -> Result<()> {
    let srv = spawn().await?;
    srv.seed_admin("root", "toor").await?;
    let c = client();

    let resp = srv.login(&c, "root", "toor").await?;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/auth/admin"));
    Ok(())
}

#[tokio::test]
async fn logout_clears_session() -> Result<()> {
    let srv = spawn().await?;
    let c = srv.signed_in("alice").await?;
    assert_eq!(srv.state.sessions.len(), 1);

    let resp = c.get(srv.url("/auth/logout")).send().await?;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/"));
    assert!(srv.state.sessions.is_empty());

    let resp = c.get(srv.url("/auth/update")).send().await?;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/auth/login"));
    Ok(())
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    let srv = spawn().await?;
    let resp = client().get(srv.url("/health")).send().await?;
    assert_eq!(resp.status(), 200);
    Ok(())
}
