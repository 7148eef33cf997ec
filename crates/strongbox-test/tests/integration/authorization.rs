#![allow(clippy::unused_async, unused_must_use)]
//! Authorization integration tests.
//!
//! Verifies that the role gate admits exactly the roles each route declares
//! and that every denial is the same 401 with a `Location` pointing at the
//! login route, whatever resource was asked for.
//!
//! ## Role sets
//! - vault routes (`/files`, `/upload`, `/delete`, `/mkdir`, `/share`): admin, user
//! - `/admin/users`: admin
//! - `/setup`: guest only
//! - `/shared`, `/user/login`, `/user/register`, `/user/whoami`: everyone

use salvo::http::StatusCode;

use super::helpers::*;

const VAULT_ROUTES: [(&str, &str); 5] = [
    ("GET", "/files/docs"),
    ("POST", "/upload/docs"),
    ("POST", "/delete/docs/a.txt"),
    ("POST", "/mkdir/docs/new"),
    ("POST", "/share/docs/a.txt"),
];

fn request(method: &str, path: &str) -> TestRequest {
    match method {
        "GET" => TestRequest::get(path),
        _ => TestRequest::post(path),
    }
}

#[test_log::test(tokio::test)]
async fn anonymous_is_denied_on_vault_routes() {
    let vault = TestVault::new().await;
    vault.write_file("docs/a.txt", "hello");

    for (method, path) in VAULT_ROUTES {
        request(method, path)
            .send(&vault.service)
            .await
            .assert_status(StatusCode::UNAUTHORIZED)
            .assert_header("location", "/user/login");
    }

    assert!(vault.root().join("docs/a.txt").exists());
    assert!(!vault.root().join("docs/new").exists());
}

#[test_log::test(tokio::test)]
async fn guest_role_is_denied_on_vault_routes() {
    let vault = TestVault::new().await;
    vault.write_file("docs/a.txt", "hello");
    let (_, guest) = vault.seed_session("visitor", Role::Guest).await;

    for (method, path) in VAULT_ROUTES {
        request(method, path)
            .cookie(&guest)
            .send(&vault.service)
            .await
            .assert_status(StatusCode::UNAUTHORIZED)
            .assert_header("location", "/user/login");
    }
}

#[test_log::test(tokio::test)]
async fn denial_does_not_reveal_existence() {
    let vault = TestVault::new().await;
    vault.write_file("docs/a.txt", "hello");

    let existing = TestRequest::get("/files/docs/a.txt")
        .send(&vault.service)
        .await;
    let missing = TestRequest::get("/files/docs/absent.txt")
        .send(&vault.service)
        .await;

    assert_eq!(existing.status, missing.status);
    assert_eq!(existing.body_string(), missing.body_string());
}

#[test_log::test(tokio::test)]
async fn admin_has_vault_access() {
    let vault = TestVault::new().await;
    vault.write_file("docs/a.txt", "hello");
    let (_, admin) = vault.seed_session("root", Role::Admin).await;

    TestRequest::get("/files/docs/a.txt")
        .cookie(&admin)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("hello");
}

#[test_log::test(tokio::test)]
async fn user_is_denied_on_admin_routes() {
    let vault = TestVault::new().await;
    let (alice, cookie) = vault.seed_session("alice", Role::User).await;

    TestRequest::get("/admin/users")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Acting on one's own record does not lift the role requirement
    TestRequest::post(&format!("/admin/users/{}/role", alice.id))
        .cookie(&cookie)
        .form(&[("role", "admin")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn legacy_same_actor_still_requires_role() {
    let vault = TestVault::with_config(|config| config.access.legacy_same_actor = true).await;
    let (alice, cookie) = vault.seed_session("alice", Role::User).await;

    TestRequest::post(&format!("/admin/users/{}/role", alice.id))
        .cookie(&cookie)
        .form(&[("role", "admin")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let me = TestRequest::get("/user/whoami")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .json();
    assert_eq!(me["user"]["role"], "user");
}

#[test_log::test(tokio::test)]
async fn admin_lists_users_without_hashes() {
    let vault = TestVault::new().await;
    let (_, admin) = vault.seed_session("root", Role::Admin).await;
    vault.seed_user("alice", Role::User).await;

    let users = TestRequest::get("/admin/users")
        .cookie(&admin)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("password_hash")
        .assert_body_not_contains("argon2")
        .json();

    let names: Vec<&str> = users
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|user| user["username"].as_str())
        .collect();
    assert_eq!(names, ["root", "alice"]);
}

#[test_log::test(tokio::test)]
async fn role_change_applies_on_next_request() {
    let vault = TestVault::new().await;
    let (_, admin) = vault.seed_session("root", Role::Admin).await;
    let (alice, cookie) = vault.seed_session("alice", Role::User).await;

    TestRequest::post(&format!("/admin/users/{}/role", alice.id))
        .cookie(&admin)
        .form(&[("role", "guest")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("\"role\":\"guest\"");

    // Her sessions were revoked along with the role change
    TestRequest::get("/files")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let relogged = vault.login("alice", TEST_PASSWORD).await;
    TestRequest::get("/files")
        .cookie(&relogged)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn demotion_revokes_shares() {
    let vault = TestVault::new().await;
    vault.write_file("a.txt", "a");
    let (_, admin) = vault.seed_session("root", Role::Admin).await;
    let (alice, cookie) = vault.seed_session("alice", Role::User).await;

    let share = TestRequest::post("/share/a.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    let token = share["token"].as_str().expect("token").to_string();

    TestRequest::post(&format!("/admin/users/{}/role", alice.id))
        .cookie(&admin)
        .form(&[("role", "guest")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK);

    TestRequest::get(&format!("/shared?token={token}"))
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn role_change_rejects_unknown_role_and_user() {
    let vault = TestVault::new().await;
    let (admin_user, admin) = vault.seed_session("root", Role::Admin).await;

    TestRequest::post(&format!("/admin/users/{}/role", admin_user.id))
        .cookie(&admin)
        .form(&[("role", "superuser")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    TestRequest::post("/admin/users/9999/role")
        .cookie(&admin)
        .form(&[("role", "user")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn healthcheck_is_open() {
    let vault = TestVault::new().await;

    TestRequest::get("/healthcheck")
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("OK");

    let (_, cookie) = vault.seed_session("alice", Role::User).await;
    TestRequest::get("/healthcheck")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK);
}
