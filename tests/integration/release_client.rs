//! Registry lookups against a mock GitHub API.

use super::{LATEST_PATH, mount_latest, repository};
use autologin_updater::core::{ErrorKind, UpdateError};
use autologin_updater::release::ReleaseClient;
use autologin_updater::test_utils::{ReleaseFixture, init_test_logging};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ReleaseClient {
    ReleaseClient::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_latest_parses_release() {
    init_test_logging(None);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .and(header("accept", "application/vnd.github+json"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                ReleaseFixture::new("v1.0.16")
                    .notes("Faster logins")
                    .asset("AutoLogin-1.0.16.msi", 2048, "http://localhost/a.msi")
                    .to_json(),
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let release = client(&server).fetch_latest(&repository(), &CancellationToken::new()).await.unwrap();
    assert_eq!(release.tag, "v1.0.16");
    assert_eq!(release.notes, "Faster logins");
    assert_eq!(release.assets.len(), 1);
    assert_eq!(release.assets[0].size, 2048);
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ReleaseFixture::new("v1.0.0").to_json()))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .with_token("ghp_test")
        .fetch_latest(&repository(), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;

    // Two failures, then the real answer
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_latest(&server, ReleaseFixture::new("v1.0.3").to_json(), 1).await;

    let release = client(&server).fetch_latest(&repository(), &CancellationToken::new()).await.unwrap();
    assert_eq!(release.tag, "v1.0.3");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .with_max_retries(2)
        .fetch_latest(&repository(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).fetch_latest(&repository(), &CancellationToken::new()).await.unwrap_err();
    match err {
        UpdateError::NotFound { repository } => assert_eq!(repository, "TradinxLite/autologin"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1767225600"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).fetch_latest(&repository(), &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).fetch_latest(&repository(), &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPayload);
}

#[tokio::test]
async fn test_cancelled_before_request() {
    let server = MockServer::start().await;
    mount_latest(&server, ReleaseFixture::new("v1.0.3").to_json(), 0).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client(&server).fetch_latest(&repository(), &cancel).await.unwrap_err();
    assert!(matches!(err, UpdateError::Cancelled));
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ReleaseFixture::new("v1.0.3").to_json())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client(&server).fetch_latest(&repository(), &cancel).await.unwrap_err();
    assert!(matches!(err, UpdateError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(3));
}
