use assert_fs::prelude::*;
use filebridge::auth::{AuthStorage, MemoryAuthStorage, ServerCredentials};
use filebridge::boundary::{adapter, NOT_INITIALIZED};
use filebridge::config::settings::Config;
use filebridge::{Resource, SearchResult};
use httpmock::prelude::*;
use serde_json::json;
use serial_test::serial;

fn connect(server: &MockServer) -> MemoryAuthStorage {
    let storage = MemoryAuthStorage::default();
    adapter::create_client_with(&server.base_url(), Config::default(), Box::new(storage.clone()));
    assert_eq!(adapter::get_last_error(), None);
    storage
}

fn connect_with_token(server: &MockServer) -> MemoryAuthStorage {
    let storage = connect(server);
    assert!(adapter::set_token("boundary-token"));
    storage
}

#[test]
#[serial]
fn list_after_logout_fails_without_reaching_the_server() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path("/api/resources/docs")
            .header("X-Auth", "boundary-token");
        then.status(200).json_body(json!({
            "name": "docs",
            "path": "/docs",
            "isDir": true,
            "items": [{ "name": "a.txt", "path": "/docs/a.txt", "isDir": false }]
        }));
    });

    connect_with_token(&server);
    let json = adapter::list_directory("/docs").unwrap();
    let docs: Resource = serde_json::from_str(&json).unwrap();
    assert_eq!(docs.num_files, 1);

    assert!(adapter::logout());
    assert!(adapter::list_directory("/docs").is_none());

    let error = adapter::get_last_error().unwrap();
    assert!(error.contains("Not authenticated"), "{}", error);
    assert_eq!(listing.hits(), 1);

    adapter::destroy_client();
}

#[test]
#[serial]
fn upload_conflict_sends_nothing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/resources/docs/a.txt");
        then.status(200)
            .json_body(json!({ "name": "a.txt", "path": "/docs/a.txt", "isDir": false }));
    });
    let upload = server.mock(|when, then| {
        when.method(POST).path("/api/resources/docs/a.txt");
        then.status(200);
    });

    let temp = assert_fs::TempDir::new().unwrap();
    let local = temp.child("a.txt");
    local.write_str("local copy").unwrap();

    connect_with_token(&server);
    let uploaded =
        adapter::upload_from_file("/docs/a.txt", local.path().to_str().unwrap(), false);

    assert!(!uploaded);
    let error = adapter::get_last_error().unwrap();
    assert!(error.to_lowercase().contains("conflict"), "{}", error);
    assert_eq!(upload.hits(), 0);

    adapter::destroy_client();
}

#[test]
#[serial]
fn success_clears_the_last_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/api/resources/missing");
        then.status(404).body("404 Not Found");
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/resources/fresh/");
        then.status(200);
    });

    connect_with_token(&server);

    assert!(!adapter::delete("/missing"));
    let error = adapter::get_last_error().unwrap();
    assert!(error.contains("/missing"), "{}", error);
    // reading does not consume it
    assert_eq!(adapter::get_last_error(), Some(error));

    assert!(adapter::create_directory("/fresh"));
    assert_eq!(adapter::get_last_error(), None);

    adapter::destroy_client();
}

#[test]
#[serial]
fn login_returns_credentials_json() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/login")
            .json_body(json!({ "username": "alice", "password": "secret", "recaptcha": "" }));
        then.status(200).body("issued-token");
    });

    let storage = connect(&server);
    assert!(!adapter::is_authenticated());
    assert_eq!(adapter::get_last_error(), None);

    let json = adapter::login("alice", "secret").unwrap();
    let credentials: ServerCredentials = serde_json::from_str(&json).unwrap();

    assert_eq!(credentials.token, "issued-token");
    assert_eq!(credentials.server_url, server.base_url());
    assert!(adapter::is_authenticated());
    assert_eq!(storage.load().unwrap(), Some(credentials));

    adapter::destroy_client();
}

#[test]
#[serial]
fn failed_login_reports_the_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/login");
        then.status(403).body("403 Forbidden");
    });

    connect(&server);
    assert!(adapter::login("alice", "wrong").is_none());
    assert!(adapter::get_last_error().unwrap().contains("403"));
    assert!(!adapter::is_authenticated());

    adapter::destroy_client();
}

#[test]
#[serial]
fn logout_twice_succeeds() {
    let server = MockServer::start();
    connect_with_token(&server);

    assert!(adapter::is_authenticated());
    assert!(adapter::logout());
    assert!(adapter::logout());
    assert!(!adapter::is_authenticated());
    assert_eq!(adapter::get_last_error(), None);

    adapter::destroy_client();
}

#[test]
#[serial]
fn destroy_without_a_client_is_harmless() {
    adapter::destroy_client();
    adapter::destroy_client();
    assert_eq!(adapter::get_last_error(), None);

    assert!(!adapter::create_directory("/x"));
    assert_eq!(adapter::get_last_error().as_deref(), Some(NOT_INITIALIZED));
    assert!(adapter::search("x", "/").is_none());
    assert!(!adapter::is_authenticated());
    assert_eq!(adapter::get_last_error().as_deref(), Some(NOT_INITIALIZED));
}

#[test]
#[serial]
fn operations_after_destroy_fail() {
    let server = MockServer::start();
    connect_with_token(&server);
    adapter::destroy_client();

    assert!(!adapter::set_token("again"));
    assert_eq!(adapter::get_last_error().as_deref(), Some(NOT_INITIALIZED));
}

#[test]
#[serial]
fn recreating_the_client_starts_a_new_session() {
    let server = MockServer::start();
    connect_with_token(&server);
    assert!(adapter::is_authenticated());

    connect(&server);
    assert!(!adapter::is_authenticated());

    adapter::destroy_client();
}

#[test]
#[serial]
fn invalid_base_url_leaves_no_client() {
    adapter::create_client_with(
        "files.example.com",
        Config::default(),
        Box::new(MemoryAuthStorage::default()),
    );
    assert!(adapter::get_last_error().unwrap().contains("http://"));

    assert!(!adapter::logout());
    assert_eq!(adapter::get_last_error().as_deref(), Some(NOT_INITIALIZED));
}

#[test]
#[serial]
fn restore_session_uses_stored_credentials() {
    let server = MockServer::start();
    let storage = MemoryAuthStorage::default();
    storage
        .save(&ServerCredentials {
            server_url: server.base_url(),
            token: "kept".to_string(),
        })
        .unwrap();

    adapter::create_client_with(&server.base_url(), Config::default(), Box::new(storage));
    assert!(!adapter::is_authenticated());
    assert!(adapter::restore_session());
    assert!(adapter::is_authenticated());

    adapter::destroy_client();
}

#[test]
#[serial]
fn search_and_download_through_the_boundary() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/search/")
            .query_param("query", "notes");
        then.status(200)
            .json_body(json!([{ "path": "work/notes.md", "dir": false }]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/raw/work/notes.md");
        then.status(200).body("remember the milk");
    });

    let temp = assert_fs::TempDir::new().unwrap();
    let target = temp.child("notes.md");

    connect_with_token(&server);

    let json = adapter::search("notes", "/").unwrap();
    let results: Vec<SearchResult> = serde_json::from_str(&json).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "work/notes.md");

    assert!(adapter::download_to_file(
        "/work/notes.md",
        target.path().to_str().unwrap()
    ));
    target.assert("remember the milk");

    adapter::destroy_client();
}

#[tokio::test]
#[serial]
async fn blocking_calls_from_async_code_fail_cleanly() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.path_contains("/api/");
            then.status(200).json_body(json!({ "name": "", "path": "/", "isDir": true }));
        })
        .await;

    connect_with_token(&server);
    assert!(adapter::is_authenticated());

    assert!(adapter::list_directory("/").is_none());
    let error = adapter::get_last_error().unwrap();
    assert!(error.contains("async runtime"), "{}", error);
    assert!(!adapter::create_directory("/x"));
    assert!(adapter::get_last_error().unwrap().contains("async runtime"));
    assert_eq!(any.hits_async().await, 0);

    // tearing down from here must not block either
    adapter::destroy_client();
    assert_eq!(adapter::get_last_error(), None);
}

#[test]
#[serial]
fn completions_through_the_c_exports() {
    use filebridge::boundary::exports::{fb_completions, fb_string_free};
    use std::ffi::{CStr, CString};

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/resources/docs");
        then.status(200).json_body(json!({
            "name": "docs",
            "path": "/docs",
            "isDir": true,
            "items": [
                { "name": "Reports", "path": "/docs/Reports", "isDir": true },
                { "name": "readme.md", "path": "/docs/readme.md", "isDir": false },
                { "name": "todo.txt", "path": "/docs/todo.txt", "isDir": false }
            ]
        }));
    });

    connect_with_token(&server);

    let partial = CString::new("/docs/re").unwrap();
    let json = unsafe {
        let raw = fb_completions(partial.as_ptr());
        assert!(!raw.is_null());
        let text = CStr::from_ptr(raw).to_str().unwrap().to_string();
        fb_string_free(raw);
        text
    };
    let matches: Vec<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(matches, vec!["/docs/Reports/", "/docs/readme.md"]);
    assert_eq!(adapter::get_last_error(), None);

    adapter::destroy_client();
}
