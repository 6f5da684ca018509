//! Integration tests for uploads (new files and overwrites)

use std::io::Write;
use std::time::Duration;

use dirmirror_core::ports::{IRemoteConnector, RemoteError};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, name, RESOURCES_PATH};

fn local_file(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_upload_new_file() {
    let (server, connector) = common::setup_disk_mock().await;
    let content = b"hello mirror";
    let file = local_file(content);

    let target = common::mount_upload_target(&server, "app:/a.txt", false).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .and(body_bytes(content.to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    connector
        .upload(file.path(), &name("a.txt"), false)
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_upload_overwrite_sets_flag() {
    let (server, connector) = common::setup_disk_mock().await;
    let file = local_file(b"v2");

    let target = common::mount_upload_target(&server, "app:/a.txt", true).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    connector
        .upload(file.path(), &name("a.txt"), true)
        .await
        .expect("overwrite failed");
}

#[tokio::test]
async fn test_upload_existing_without_overwrite_conflicts() {
    let (server, connector) = common::setup_disk_mock().await;
    let file = local_file(b"data");

    Mock::given(method("GET"))
        .and(path(format!("{RESOURCES_PATH}/upload")))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "description": "Resource \"app:/a.txt\" already exists.",
            "error": "DiskResourceAlreadyExistsError"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = connector
        .upload(file.path(), &name("a.txt"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Conflict(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_upload_target_without_href_is_invalid() {
    let (server, connector) = common::setup_disk_mock().await;
    let file = local_file(b"data");

    Mock::given(method("GET"))
        .and(path(format!("{RESOURCES_PATH}/upload")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "method": "PUT"
        })))
        .mount(&server)
        .await;

    assert!(matches!(
        connector.upload(file.path(), &name("a.txt"), false).await,
        Err(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_upload_missing_local_file_makes_no_request() {
    let (server, connector) = common::setup_disk_mock().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = connector
        .upload(&dir.path().join("vanished.txt"), &name("vanished.txt"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::LocalFile(_)));
}

#[tokio::test]
async fn test_upload_storage_error_on_put() {
    let (server, connector) = common::setup_disk_mock().await;
    let file = local_file(b"too big");

    let target = common::mount_upload_target(&server, "app:/big.bin", false).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .respond_with(ResponseTemplate::new(507).set_body_string("Insufficient Storage"))
        .mount(&server)
        .await;

    let err = connector
        .upload(file.path(), &name("big.bin"), false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RemoteError::ServerError {
            status: 507,
            message: "Insufficient Storage".into()
        }
    );
}

#[tokio::test]
async fn test_upload_times_out() {
    let server = MockServer::start().await;
    let connector = common::connector_for(&server, Duration::from_millis(200), 100);
    let file = local_file(b"slow");

    Mock::given(method("GET"))
        .and(path(format!("{RESOURCES_PATH}/upload")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "href": "http://unused" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    assert!(matches!(
        connector.upload(file.path(), &name("slow.txt"), false).await,
        Err(RemoteError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_upload_streams_large_file_with_content_length() {
    let (server, connector) = common::setup_disk_mock().await;
    let content: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
    let file = local_file(&content);

    let target = common::mount_upload_target(&server, "app:/big.bin", false).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .and(header("content-length", content.len().to_string().as_str()))
        .and(body_bytes(content.clone()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    connector
        .upload(file.path(), &name("big.bin"), false)
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_slow_transfer_is_bounded_by_upload_timeout_only() {
    let server = MockServer::start().await;
    let connector = common::connector_with_timeouts(
        &server,
        Duration::from_millis(200),
        Duration::from_secs(10),
    );
    let file = local_file(b"slow but fine");

    let target = common::mount_upload_target(&server, "app:/a.txt", false).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(1)))
        .expect(1)
        .mount(&server)
        .await;

    connector
        .upload(file.path(), &name("a.txt"), false)
        .await
        .expect("upload outlived the API timeout");
}

#[tokio::test]
async fn test_upload_timeout_applies_to_transfer() {
    let server = MockServer::start().await;
    let connector = common::connector_with_timeouts(
        &server,
        Duration::from_secs(5),
        Duration::from_millis(200),
    );
    let file = local_file(b"stalled");

    let target = common::mount_upload_target(&server, "app:/a.txt", false).await;
    Mock::given(method("PUT"))
        .and(path(target))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    assert!(matches!(
        connector.upload(file.path(), &name("a.txt"), false).await,
        Err(RemoteError::Timeout(_))
    ));
}
