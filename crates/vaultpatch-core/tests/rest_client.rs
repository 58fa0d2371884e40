//! `RestVaultClient` over HTTP against the mock Local REST API.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use vaultpatch_core::vault::{ClientSettings, Period, VaultApi, VaultError};
use vaultpatch_core::{NoteEditor, RestVaultClient};
use vaultpatch_core::patch::{AnchorTarget, InsertionSpec, PatchEngine, PatchRequest, Position};
use vaultpatch_test_utils::{MemoryVault, MockRestApi, TEST_API_KEY, TestConfigBuilder};

fn client(mock: &MockRestApi) -> RestVaultClient {
    RestVaultClient::new(&mock.base_url(), TEST_API_KEY, ClientSettings::default()).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_file_round_trip_with_encoded_path() {
    let mock = MockRestApi::start().await.unwrap();
    let c = client(&mock);

    c.put_file("Daily Notes/2024 #1.md", "hello").await.unwrap();
    assert_eq!(mock.content("Daily Notes/2024 #1.md").as_deref(), Some("hello"));
    c.append_file("Daily Notes/2024 #1.md", " world").await.unwrap();
    assert_eq!(c.get_file("Daily Notes/2024 #1.md").await.unwrap(), "hello world");

    let put = &mock.requests()[0];
    assert_eq!(put.method, "PUT");
    assert_eq!(put.path, "/vault/Daily%20Notes/2024%20%231.md");
    assert_eq!(put.content_type.as_deref(), Some("text/markdown"));
}

#[tokio::test]
async fn test_listings() {
    let vault = MemoryVault::new()
        .with_file("a.md", "")
        .with_file("Projects/x.md", "");
    let mock = MockRestApi::with_vault(Arc::new(vault), TEST_API_KEY)
        .await
        .unwrap();
    let c = client(&mock);

    assert_eq!(c.list_files(None).await.unwrap(), vec!["Projects/", "a.md"]);
    assert_eq!(c.list_files(Some("Projects")).await.unwrap(), vec!["x.md"]);
    let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/vault/", "/vault/Projects/"]);
}

#[tokio::test]
async fn test_not_found_maps_to_api_error() {
    let mock = MockRestApi::start().await.unwrap();
    let err = client(&mock).get_file("missing.md").await.unwrap_err();
    match &err {
        VaultError::Api {
            status,
            code,
            message,
            operation,
            suggestion,
        } => {
            assert_eq!(*status, 404);
            assert_eq!(*code, 40400);
            assert_eq!(message, "File not found");
            assert_eq!(*operation, "get_file");
            assert!(suggestion.as_deref().unwrap().contains("file exists"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_wrong_key_is_unauthorized() {
    let mock = MockRestApi::start().await.unwrap();
    let c = RestVaultClient::new(&mock.base_url(), "wrong", ClientSettings::default()).unwrap();
    let err = c.list_files(None).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("API key"));
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let mock = MockRestApi::start().await.unwrap();
    mock.fail_with(StatusCode::INTERNAL_SERVER_ERROR, "plugin crashed");
    let err = client(&mock).get_file("a.md").await.unwrap_err();
    assert!(matches!(
        err,
        VaultError::Api { status: 500, code: -1, ref message, .. } if message == "plugin crashed"
    ));
}

#[tokio::test]
async fn test_unparseable_json_is_parse_error() {
    let mock = MockRestApi::start().await.unwrap();
    mock.fail_with(StatusCode::OK, "not json");
    let err = client(&mock).list_files(None).await.unwrap_err();
    assert!(matches!(err, VaultError::Parse { operation: "list_files", .. }));
}

#[tokio::test]
async fn test_search_endpoints() {
    let vault = MemoryVault::new().with_file("c.md", "more coffee");
    let mock = MockRestApi::with_vault(Arc::new(vault), TEST_API_KEY)
        .await
        .unwrap();
    let c = client(&mock);

    let hits = c.simple_search("coffee", 50).await.unwrap();
    assert_eq!(hits[0].filename, "c.md");
    assert_eq!(hits[0].matches[0].span.start, 5);

    c.search_json_logic(&json!({"in": ["coffee", {"var": "content"}]}))
        .await
        .unwrap();
    c.search_dql("TABLE file.mtime").await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].path, "/search/simple/");
    assert_eq!(
        requests[0].query.as_deref(),
        Some("query=coffee&contextLength=50")
    );
    assert_eq!(
        requests[1].content_type.as_deref(),
        Some("application/vnd.olrapi.jsonlogic+json")
    );
    assert_eq!(
        requests[2].content_type.as_deref(),
        Some("application/vnd.olrapi.dataview.dql+txt")
    );
    assert_eq!(mock.vault().queries()[1], "TABLE file.mtime");
}

#[tokio::test]
async fn test_periodic_endpoints() {
    let mock = MockRestApi::start().await.unwrap();
    mock.vault().set_periodic(Period::Weekly, "week plan");
    let c = client(&mock);

    assert_eq!(c.periodic_note(Period::Weekly).await.unwrap(), "week plan");
    let recent = c
        .recent_periodic_notes(Period::Weekly, 3, true)
        .await
        .unwrap();
    assert_eq!(recent[0]["content"], "week plan");
    assert!(c.periodic_note(Period::Daily).await.unwrap_err().is_not_found());

    let requests = mock.requests();
    assert_eq!(requests[0].path, "/periodic/weekly/");
    assert_eq!(requests[1].path, "/periodic/weekly/recent");
    assert_eq!(
        requests[1].query.as_deref(),
        Some("limit=3&includeContent=true")
    );
}

#[tokio::test]
async fn test_delete() {
    let mock = MockRestApi::start().await.unwrap();
    mock.insert("old.md", "x");
    let c = client(&mock);
    c.delete_file("old.md").await.unwrap();
    assert!(mock.content("old.md").is_none());
    assert!(c.delete_file("old.md").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_connection_refused_has_hint() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let settings = ClientSettings {
        connect_timeout: Duration::from_millis(500),
        ..ClientSettings::default()
    };
    let c = RestVaultClient::new(&format!("http://{addr}"), TEST_API_KEY, settings).unwrap();
    let err = c.get_file("a.md").await.unwrap_err();
    match err {
        VaultError::Network { operation, hint, .. } => {
            assert_eq!(operation, "get_file");
            assert!(hint.unwrap().contains("Is Obsidian running"));
        }
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_editor_patches_through_http() {
    let mock = MockRestApi::start().await.unwrap();
    mock.insert("p.md", "# Inbox\n- one\n");
    let config = TestConfigBuilder::new()
        .api_key(TEST_API_KEY)
        .base_url(&mock.base_url())
        .build();
    let vault = Arc::new(RestVaultClient::from_config(&config.vault).unwrap());
    let editor = NoteEditor::new(vault, PatchEngine::default());

    let request = PatchRequest {
        target: AnchorTarget::heading("Inbox", false),
        spec: InsertionSpec::new(Position::End, "- two"),
        create_if_missing: false,
    };
    editor.patch("p.md", &request).await.unwrap();
    assert_eq!(mock.content("p.md").unwrap(), "# Inbox\n- one\n- two\n");

    let methods: Vec<String> = mock.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["GET", "PUT"]);
}
