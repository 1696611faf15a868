//! Admin pages are reserved for the admin role.

mod common;

use anyhow::Result;
use common::{client, location, spawn};
use microblog::storage::users;

const ADMIN_PATHS: [&str; 3] = ["/auth/admin", "/auth/adminusers", "/auth/adminposts"];

#[tokio::test]
async fn anonymous_is_sent_to_login() -> Result<()> {
    let srv = spawn().await?;
    let anon = client();
    for path in ADMIN_PATHS {
        let resp = anon.get(srv.url(path)).send().await?;
        assert_eq!(resp.status(), 303, "{}", path);
        assert_eq!(location(&resp), Some("/auth/login"));
    }
    Ok(())
}

#[tokio::test]
async fn ordinary_user_is_forbidden() -> Result<()> {
    let srv = spawn().await?;
    let alice = srv.signed_in("alice").await?;
    for path in ADMIN_PATHS {
        let resp = alice.get(srv.url(path)).send().await?;
        assert_eq!(resp.status(), 403, "{}", path);
        let body: serde_json::Value = resp.json().await?;
        assert_eq!(body["code"], "admin_required");
    }
    Ok(())
}

#[tokio::test]
async fn role_match_is_exact() -> Result<()> {
    let srv = spawn().await?;
    let alice = srv.signed_in("alice").await?;
    assert!(users::set_role(srv.db(), "alice", "ADMIN").await?);

    let resp = alice.get(srv.url("/auth/adminusers")).send().await?;
    assert_eq!(resp.status(), 403);
    Ok(())
}

#[tokio::test]
async fn admin_sees_every_user() -> Result<()> {
    let srv = spawn().await?;
    srv.signed_in("alice").await?;
    srv.signed_in("bob").await?;
    srv.seed_admin("root", "toor").await?;
    let root = client();
    srv.login(&root, "root", "toor").await?;

    let page = srv.view(&root, "/auth/admin").await?;
    assert_eq!(page["template"], "admin/index.html");

    let page = srv.view(&root, "/auth/adminusers").await?;
    assert_eq!(page["template"], "admin/users.html");
    let users = page["data"]["users"].as_array().cloned().unwrap_or_default();
    let names: Vec<&str> = users.iter().filter_map(|u| u["username"].as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "root"]);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    let page = srv.view(&root, "/auth/adminposts").await?;
    assert_eq!(page["template"], "admin/posts.html");
    Ok(())
}

#[tokio::test]
async fn seeding_promotes_an_existing_account() -> Result<()> {
    let srv = spawn().await?;
    let alice = srv.signed_in("alice").await?;
    srv.seed_admin("alice", "ignored").await?;

    // Role is read per request, so the open session sees the promotion.
    let resp = alice.get(srv.url("/auth/admin")).send().await?;
    assert_eq!(resp.status(), 200);
    assert!(srv.user("alice").await?.is_admin());
    Ok(())
}
