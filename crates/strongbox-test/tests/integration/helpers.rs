#![allow(clippy::unused_async, clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Setting up an isolated vault (one temporary directory and store per test)
//! - Seeding users and opening sessions
//! - Making HTTP requests against the full router
//! - Asserting on responses
//!
//! ## Isolation
//! Each `TestVault` owns a fresh `MemoryStore` and a temporary directory that is
//! removed when the vault goes out of scope, so tests run in parallel without
//! contention.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use salvo::http::header::HeaderName;
use salvo::http::{Method, ReqBody, StatusCode};
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use tempfile::TempDir;

use strongbox_test::app::state::{AppState, StateHandler};
use strongbox_test::component::auth::password::hash_password;
use strongbox_test::component::config::*;
use strongbox_test::component::constants::SESSION_COOKIE;
use strongbox_test::component::db::{CredentialStore, MemoryStore};
use strongbox_test::component::vault::FileVault;

pub use strongbox_test::component::model::user::{NewUser, Role, User};
pub use tracing;

/// Password used for every seeded user unless a test says otherwise.
pub const TEST_PASSWORD: &str = "correct-horse";

const MULTIPART_BOUNDARY: &str = "strongbox-test-boundary";

/// Test configuration - static struct instead of loading from file.
fn test_config(vault_root: PathBuf) -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
            serve_origin: Some("http://vault.test".to_string()),
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: None,
            max_connections: 1,
        },
        vault: VaultConfig { root: vault_root },
        auth: AuthConfig {
            session_ttl_seconds: 3600,
            session_purge_interval_seconds: 60,
            min_password_length: 2,
            allow_registration: true,
            secure_cookie: false,
            bootstrap_admin: None,
        },
        access: AccessConfig {
            legacy_same_actor: false,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// An isolated vault with its own store, directory and router.
pub struct TestVault {
    dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
    pub service: Service,
}

impl TestVault {
    /// Creates a vault with the default test configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Creates a vault after letting the caller adjust the configuration.
    ///
    /// ## Panics
    /// Panics if the temporary directory or the vault root cannot be created.
    pub async fn with_config(adjust: impl FnOnce(&mut Settings)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temporary directory");
        let mut config = test_config(dir.path().join("vault"));
        adjust(&mut config);

        let vault = FileVault::open(&config.vault.root)
            .await
            .expect("Failed to open vault root");
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::with_store(Arc::clone(&store), vault, &config));

        // Matches the router built in main.rs
        let router = Router::new()
            .hoop(StateHandler {
                state: Arc::clone(&state),
            })
            .hoop(ConfigHandler {
                settings: Arc::new(config),
            })
            .push(strongbox_test::app::api::routes());

        Self {
            dir,
            store,
            state,
            service: Service::new(router),
        }
    }

    /// Canonical path of the vault root on disk.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.state.vault.root().path()
    }

    /// Scratch directory next to the vault root, outside of it.
    ///
    /// ## Panics
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn outside(&self) -> PathBuf {
        let outside = self.dir.path().join("outside");
        std::fs::create_dir_all(&outside).expect("Failed to create outside directory");
        outside
    }

    /// Writes a file below the vault root, creating parents.
    ///
    /// ## Panics
    /// Panics on I/O failure.
    pub fn write_file(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, contents).expect("Failed to write vault file");
    }

    /// Inserts a user with the given role and `TEST_PASSWORD`.
    ///
    /// ## Panics
    /// Panics if hashing or insertion fails.
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        let password_hash = hash_password(TEST_PASSWORD).expect("Failed to hash password");
        self.store
            .insert_user(NewUser {
                username,
                password_hash: &password_hash,
                role,
            })
            .await
            .expect("Failed to seed user")
    }

    /// Logs in through the HTTP surface and returns the `Cookie` header value.
    ///
    /// ## Panics
    /// Panics if the login is rejected.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = TestRequest::post("/user/login")
            .form(&[("username", username), ("password", password)])
            .send(&self.service)
            .await
            .assert_status(StatusCode::OK);

        response
            .session_cookie()
            .expect("Login response should set the session cookie")
    }

    /// Seeds a user and logs them in.
    pub async fn seed_session(&self, username: &str, role: Role) -> (User, String) {
        let user = self.seed_user(username, role).await;
        let cookie = self.login(username, TEST_PASSWORD).await;
        (user, cookie)
    }
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl TestRequest {
    /// Creates a new test request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a new GET request.
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a new POST request.
    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sends the session cookie returned by `TestVault::login`.
    #[must_use]
    pub fn cookie(self, cookie: &str) -> Self {
        self.header("Cookie", cookie)
    }

    /// Sets the Content-Type header.
    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header("Content-Type", content_type)
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets an url-encoded form body. Values are sent verbatim and must not
    /// need escaping.
    #[must_use]
    pub fn form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        self.content_type("application/x-www-form-urlencoded")
            .body(encoded)
    }

    /// Sets a multipart body with one part per `(filename, contents)` pair,
    /// all under the given field name.
    #[must_use]
    pub fn multipart(self, field: &str, files: &[(&str, &str)]) -> Self {
        let mut body = String::new();
        for (filename, contents) in files {
            body.push_str(&format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n\
                 {contents}\r\n"
            ));
        }
        body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));

        self.content_type(&format!(
            "multipart/form-data; boundary={MULTIPART_BOUNDARY}"
        ))
        .body(body)
    }

    /// Sends the request to the test service and returns the response.
    ///
    /// ## Panics
    /// Panics if the request cannot be sent or the response cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method.as_str() {
            "GET" => TestClient::get(&url),
            "POST" => TestClient::post(&url),
            "PUT" => TestClient::put(&url),
            "DELETE" => TestClient::delete(&url),
            _ => salvo::test::RequestBuilder::new(&url, self.method.clone()),
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        if let Some(body_bytes) = self.body {
            client = client.body(ReqBody::Once(body_bytes.into()));
        }

        let mut response = client.send(service).await;

        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let cookies: Vec<(String, String)> = response
            .cookies()
            .iter()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse {
            status,
            headers,
            cookies,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}: {}",
            self.status,
            self.body_string()
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    #[must_use]
    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        let value = self.get_header(name);
        assert!(value.is_some(), "Header '{name}' not found in response");
        assert_eq!(
            value,
            Some(expected),
            "Header '{name}' expected '{expected}' but got '{value:?}'"
        );
        self
    }

    /// Asserts that the response body contains the expected substring.
    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        let body = self.body_string();
        assert!(
            body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{body}"
        );
        self
    }

    /// Asserts that the response body does not contain the specified substring.
    #[must_use]
    pub fn assert_body_not_contains(self, unexpected: &str) -> Self {
        let body = self.body_string();
        assert!(
            !body.contains(unexpected),
            "Expected body to NOT contain '{unexpected}' but got:\n{body}"
        );
        self
    }

    /// Returns the body as a UTF-8 string.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("Expected JSON body ({e}) but got:\n{}", self.body_string()))
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `strongbox_session=<token>` if the response set a session, taken
    /// from the response cookie jar or a `Set-Cookie` header.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        let from_jar = self
            .cookies
            .iter()
            .find(|(name, value)| name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value.clone());

        let from_header = || {
            self.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
                .find_map(|(_, v)| {
                    let pair = v.split(';').next()?;
                    let (name, value) = pair.split_once('=')?;
                    (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
                })
        };

        from_jar
            .or_else(from_header)
            .map(|token| format!("{SESSION_COOKIE}={token}"))
    }
}
