//! Integration tests for deleting remote objects

use dirmirror_core::ports::{IRemoteConnector, RemoteError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, name, RESOURCES_PATH};

#[tokio::test]
async fn test_delete_no_content() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("DELETE"))
        .and(path(RESOURCES_PATH))
        .and(query_param("path", "app:/b.txt"))
        .and(query_param("permanently", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    connector.delete(&name("b.txt")).await.expect("delete failed");
}

#[tokio::test]
async fn test_delete_accepted_is_success() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("DELETE"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "href": "https://cloud-api.yandex.net/v1/disk/operations/123",
            "method": "GET"
        })))
        .mount(&server)
        .await;

    connector.delete(&name("big-folder-file.bin")).await.expect("delete failed");
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("DELETE"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = connector.delete(&name("gone.txt")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_server_error_is_transient() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("DELETE"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = connector.delete(&name("b.txt")).await.unwrap_err();
    assert!(matches!(err, RemoteError::ServerError { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_delete_forbidden() {
    let (server, connector) = common::setup_disk_mock().await;

    Mock::given(method("DELETE"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "description": "Forbidden",
            "error": "ForbiddenError"
        })))
        .mount(&server)
        .await;

    assert_eq!(
        connector.delete(&name("b.txt")).await,
        Err(RemoteError::Forbidden("Forbidden".into()))
    );
}
