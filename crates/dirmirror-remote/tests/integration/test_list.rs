//! Integration tests for listing the remote root

use std::time::Duration;

use dirmirror_core::ports::{IRemoteConnector, RemoteError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, name, RESOURCES_PATH, TEST_ROOT};

fn folder_page(items: serde_json::Value, total: u64) -> serde_json::Value {
    serde_json::json!({
        "name": "app",
        "type": "dir",
        "path": "disk:/Applications/app",
        "_embedded": {
            "items": items,
            "total": total,
            "limit": 100,
            "offset": 0,
            "path": "disk:/Applications/app"
        }
    })
}

#[tokio::test]
async fn test_list_returns_only_files() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .and(query_param("path", TEST_ROOT))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_page(
            serde_json::json!([
                { "name": "a.txt", "type": "file" },
                { "name": "photos", "type": "dir" },
                { "name": "b.pdf", "type": "file" }
            ]),
            3,
        )))
        .mount(&server)
        .await;

    let names = connector.list().await.expect("list failed");

    assert_eq!(names.len(), 2);
    assert!(names.contains(&name("a.txt")));
    assert!(names.contains(&name("b.pdf")));
}

#[tokio::test]
async fn test_list_sends_oauth_header() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .and(header("Authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_page(
            serde_json::json!([]),
            0,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let names = connector.list().await.expect("list failed");
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_list_follows_pagination() {
    let server = wiremock::MockServer::start().await;
    let connector = common::connector_for(&server, Duration::from_secs(5), 2);

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_page(
            serde_json::json!([
                { "name": "1.txt", "type": "file" },
                { "name": "2.txt", "type": "file" }
            ]),
            3,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_page(
            serde_json::json!([{ "name": "3.txt", "type": "file" }]),
            3,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let names = connector.list().await.expect("list failed");

    assert_eq!(
        names.into_iter().map(String::from).collect::<Vec<_>>(),
        vec!["1.txt", "2.txt", "3.txt"]
    );
}

#[tokio::test]
async fn test_list_unauthorized() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Не авторизован.",
            "description": "Unauthorized",
            "error": "UnauthorizedError"
        })))
        .mount(&server)
        .await;

    let err = connector.list().await.unwrap_err();
    assert_eq!(err, RemoteError::Unauthorized("Unauthorized".into()));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_list_missing_root_is_not_found() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "description": "Resource not found.",
            "error": "DiskNotFoundError"
        })))
        .mount(&server)
        .await;

    assert!(connector.list().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_of_a_file_is_invalid_response() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "app",
            "type": "file"
        })))
        .mount(&server)
        .await;

    assert!(matches!(
        connector.list().await,
        Err(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_list_malformed_json_is_invalid_response() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        connector.list().await,
        Err(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_list_rate_limited() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let err = connector.list().await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::TooManyRequests {
            retry_after_secs: Some(12)
        }
    );
    assert!(err.is_transient());
}
