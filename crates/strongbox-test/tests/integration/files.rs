#![allow(clippy::unused_async, unused_must_use)]
//! File vault integration tests.
//!
//! Exercises crawl, upload, delete and mkdir through the HTTP surface and
//! checks that every path stays confined to the vault root.

use salvo::http::StatusCode;

use super::helpers::*;

const MISSING: &str = "Error: File or directory does not exist.";

async fn vault_with_docs() -> (TestVault, String) {
    let vault = TestVault::new().await;
    vault.write_file("docs/a.txt", "hello");
    vault.write_file("docs/b.md", "# bee");
    std::fs::create_dir_all(vault.root().join("docs/sub")).expect("mkdir");
    let (_, cookie) = vault.seed_session("alice", Role::User).await;
    (vault, cookie)
}

// ============================================================================
// Crawl
// ============================================================================

#[test_log::test(tokio::test)]
async fn crawl_lists_directory_sorted_with_markers() {
    let (vault, cookie) = vault_with_docs().await;

    let listing = TestRequest::get("/files/docs")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(listing["kind"], "directory");
    assert_eq!(listing["path"], "docs");
    assert_eq!(
        listing["entries"],
        serde_json::json!(["a.txt", "b.md", "sub/"])
    );
}

#[test_log::test(tokio::test)]
async fn crawl_root_lists_top_level() {
    let (vault, cookie) = vault_with_docs().await;

    let listing = TestRequest::get("/files")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(listing["path"], "");
    assert_eq!(listing["entries"], serde_json::json!(["docs/"]));
}

#[test_log::test(tokio::test)]
async fn crawl_returns_file_content() {
    let (vault, cookie) = vault_with_docs().await;

    let file = TestRequest::get("/files/docs/a.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(file["kind"], "file");
    assert_eq!(file["filename"], "a.txt");
    assert_eq!(file["extension"], "txt");
    assert_eq!(file["size"], 5);
    assert_eq!(file["content"], "hello");
}

#[test_log::test(tokio::test)]
async fn crawl_missing_entry_is_not_found() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::get("/files/docs/nope.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_contains(MISSING);
}

#[test_log::test(tokio::test)]
async fn crawl_requires_session() {
    let (vault, _) = vault_with_docs().await;

    TestRequest::get("/files/docs")
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("location", "/user/login")
        .assert_body_not_contains("a.txt");
}

// ============================================================================
// Confinement
// ============================================================================

#[test_log::test(tokio::test)]
async fn encoded_traversal_is_not_found() {
    let (vault, cookie) = vault_with_docs().await;
    std::fs::write(vault.outside().join("secret.txt"), "top secret").expect("write");

    for path in [
        "/files/..%2Foutside%2Fsecret.txt",
        "/files/docs/..%2F..%2Foutside%2Fsecret.txt",
        "/files/%2E%2E/outside/secret.txt",
    ] {
        TestRequest::get(path)
            .cookie(&cookie)
            .send(&vault.service)
            .await
            .assert_status(StatusCode::NOT_FOUND)
            .assert_body_not_contains("top secret");
    }
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn symlink_escape_looks_like_missing_entry() {
    let (vault, cookie) = vault_with_docs().await;
    let outside = vault.outside();
    std::fs::write(outside.join("secret.txt"), "top secret").expect("write");
    std::os::unix::fs::symlink(&outside, vault.root().join("docs/link")).expect("symlink");

    let escaped = TestRequest::get("/files/docs/link/secret.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_not_contains("top secret");
    let missing = TestRequest::get("/files/docs/absent.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await;

    assert_eq!(escaped.body_string(), missing.body_string());
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn special_file_looks_like_missing_entry() {
    let (vault, cookie) = vault_with_docs().await;
    let _listener = std::os::unix::net::UnixListener::bind(vault.root().join("docs/sock"))
        .expect("bind socket");

    let crawl = TestRequest::get("/files/docs/sock").cookie(&cookie).send(&vault.service);
    tokio::time::timeout(std::time::Duration::from_secs(3), crawl)
        .await
        .expect("crawl returns promptly")
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_contains(MISSING);

    let share = TestRequest::post("/share/docs/sock")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    let token = share["token"].as_str().expect("token").to_string();

    let shared = TestRequest::get(&format!("/shared?token={token}")).send(&vault.service);
    tokio::time::timeout(std::time::Duration::from_secs(3), shared)
        .await
        .expect("shared render returns promptly")
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Upload
// ============================================================================

#[test_log::test(tokio::test)]
async fn upload_stores_every_part() {
    let (vault, cookie) = vault_with_docs().await;

    let stored = TestRequest::post("/upload/docs/sub")
        .cookie(&cookie)
        .multipart("files", &[("one.txt", "first"), ("two.txt", "second")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();

    assert_eq!(stored["stored"][0]["path"], "docs/sub/one.txt");
    assert_eq!(stored["stored"][1]["size"], 6);
    assert_eq!(
        std::fs::read_to_string(vault.root().join("docs/sub/one.txt")).expect("read"),
        "first"
    );
    assert_eq!(
        std::fs::read_to_string(vault.root().join("docs/sub/two.txt")).expect("read"),
        "second"
    );
}

#[test_log::test(tokio::test)]
async fn upload_replaces_existing_file() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/upload/docs")
        .cookie(&cookie)
        .multipart("files", &[("a.txt", "replaced")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED);

    assert_eq!(
        std::fs::read_to_string(vault.root().join("docs/a.txt")).expect("read"),
        "replaced"
    );
}

#[test_log::test(tokio::test)]
async fn upload_accepts_dir_query() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/upload?dir=docs")
        .cookie(&cookie)
        .multipart("files", &[("c.txt", "sea")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED);

    assert!(vault.root().join("docs/c.txt").is_file());
}

#[test_log::test(tokio::test)]
async fn upload_without_file_part_is_bad_request() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/upload/docs")
        .cookie(&cookie)
        .multipart("attachments", &[("c.txt", "sea")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_body_contains("Missing filename");
}

#[test_log::test(tokio::test)]
async fn upload_into_missing_directory_is_not_found() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/upload/nowhere")
        .cookie(&cookie)
        .multipart("files", &[("c.txt", "sea")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_contains(MISSING);
}

#[test_log::test(tokio::test)]
async fn upload_never_writes_outside_root() {
    let (vault, cookie) = vault_with_docs().await;
    let outside = vault.outside();

    let response = TestRequest::post("/upload/docs")
        .cookie(&cookie)
        .multipart("files", &[("../../outside/evil.txt", "payload")])
        .send(&vault.service)
        .await;

    assert!(
        !response.status.is_server_error(),
        "unexpected {}",
        response.status
    );
    assert!(!outside.join("evil.txt").exists());
    assert!(!vault.root().parent().expect("parent").join("evil.txt").exists());
}

#[test_log::test(tokio::test)]
async fn rejected_part_discards_whole_batch() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/upload/docs")
        .cookie(&cookie)
        .multipart("files", &[("fresh.txt", "first"), ("sub", "second")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CONFLICT);

    assert!(!vault.root().join("docs/fresh.txt").exists());
    assert!(vault.root().join("docs/sub").is_dir());

    let listing = TestRequest::get("/files/docs")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .json();
    assert_eq!(
        listing["entries"],
        serde_json::json!(["a.txt", "b.md", "sub/"])
    );
}

#[test_log::test(tokio::test)]
async fn upload_requires_session() {
    let (vault, _) = vault_with_docs().await;

    TestRequest::post("/upload/docs")
        .multipart("files", &[("c.txt", "sea")])
        .send(&vault.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert!(!vault.root().join("docs/c.txt").exists());
}

// ============================================================================
// Delete / mkdir
// ============================================================================

#[test_log::test(tokio::test)]
async fn delete_removes_file() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/delete/docs/a.txt")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(!vault.root().join("docs/a.txt").exists());
}

#[test_log::test(tokio::test)]
async fn delete_non_empty_directory_conflicts() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/delete/docs")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CONFLICT);

    assert!(vault.root().join("docs/a.txt").exists());
}

#[test_log::test(tokio::test)]
async fn delete_root_is_refused() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/delete")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert!(vault.root().is_dir());
}

#[test_log::test(tokio::test)]
async fn mkdir_creates_nested_directories() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/mkdir/projects/2024/q1")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CREATED)
        .assert_body_contains("projects/2024/q1");

    assert!(vault.root().join("projects/2024/q1").is_dir());
}

#[test_log::test(tokio::test)]
async fn mkdir_through_file_conflicts() {
    let (vault, cookie) = vault_with_docs().await;

    TestRequest::post("/mkdir/docs/a.txt/inner")
        .cookie(&cookie)
        .send(&vault.service)
        .await
        .assert_status(StatusCode::CONFLICT);
}
