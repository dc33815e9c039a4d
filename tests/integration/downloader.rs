//! Installer downloads against a mock asset host.

use super::mount_asset;
use autologin_updater::core::{ErrorKind, UpdateError};
use autologin_updater::download::{ChecksumVerifier, Downloader};
use autologin_updater::release::Asset;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn asset(name: &str, url: String, size: u64) -> Asset {
    Asset {
        name: name.to_string(),
        download_url: url,
        size,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut verifier = ChecksumVerifier::new();
    verifier.update(bytes);
    verifier.finalize_hex()
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_download_persists_under_asset_name() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    let url = mount_asset(&server, "AutoLogin-1.0.3.AppImage", body.clone()).await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress = {
        let seen = Arc::clone(&seen);
        move |done: u64, total: u64| seen.lock().unwrap().push((done, total))
    };

    let path = downloader
        .download(
            &asset("AutoLogin-1.0.3.AppImage", url, body.len() as u64),
            Some(&sha256_hex(&body)),
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(path, temp.path().join("AutoLogin-1.0.3.AppImage"));
    assert_eq!(std::fs::read(&path).unwrap(), body);

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0), "progress went backwards: {seen:?}");
    assert_eq!(seen.last().map(|p| p.0), Some(body.len() as u64));
}

#[tokio::test]
async fn test_short_body_is_integrity_failure() {
    let server = MockServer::start().await;
    let url = mount_asset(&server, "AutoLogin-1.0.3.msi", vec![1u8; 100]).await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let err = downloader
        .download(
            &asset("AutoLogin-1.0.3.msi", url, 1000),
            None,
            &|_: u64, _: u64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        UpdateError::DownloadIntegrity { expected, actual, .. } => {
            assert_eq!(expected, "1000 bytes");
            assert_eq!(actual, "100 bytes");
        }
        other => panic!("expected DownloadIntegrity, got {other:?}"),
    }
    assert!(files_in(temp.path()).is_empty(), "partial file left behind");
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_nothing() {
    let server = MockServer::start().await;
    let url = mount_asset(&server, "AutoLogin-1.0.3.dmg", b"real installer".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let err = downloader
        .download(
            &asset("AutoLogin-1.0.3.dmg", url, 14),
            Some(&sha256_hex(b"something else")),
            &|_: u64, _: u64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DownloadIntegrity);
    assert!(files_in(temp.path()).is_empty());
}

#[tokio::test]
async fn test_server_error_restarts_transfer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.msi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    let url = mount_asset(&server, "AutoLogin-1.0.3.msi", b"installer".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let path = downloader
        .download(
            &asset("AutoLogin-1.0.3.msi", url, 9),
            None,
            &|_: u64, _: u64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"installer");
}

/// Serve `body` over raw HTTP, closing the first connection after `cut` bytes.
async fn truncating_server(body: Vec<u8>, cut: usize) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/AutoLogin-1.0.3.AppImage", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => request.extend_from_slice(&buf[..read]),
                }
            }

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let sent = if n == 0 { &body[..cut] } else { &body[..] };
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(sent).await;
            let _ = socket.shutdown().await;
        }
    });

    (url, connections)
}

#[tokio::test]
async fn test_dropped_connection_restarts_from_scratch() {
    let body: Vec<u8> = (0..100u8).collect();
    let (url, connections) = truncating_server(body.clone(), 10).await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress = {
        let seen = Arc::clone(&seen);
        move |done: u64, _total: u64| seen.lock().unwrap().push(done)
    };

    let path = downloader
        .download(
            &asset("AutoLogin-1.0.3.AppImage", url, 100),
            Some(&sha256_hex(&body)),
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(connections.load(Ordering::SeqCst), 2);
    assert_eq!(std::fs::read(path).unwrap(), body);

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.msi"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path()).with_max_attempts(2);
    let err = downloader
        .download(
            &asset(
                "AutoLogin-1.0.3.msi",
                format!("{}/download/AutoLogin-1.0.3.msi", server.uri()),
                9,
            ),
            None,
            &|_: u64, _: u64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_missing_asset_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.msi"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let err = Downloader::new(reqwest::Client::new(), temp.path())
        .download(
            &asset(
                "AutoLogin-1.0.3.msi",
                format!("{}/download/AutoLogin-1.0.3.msi", server.uri()),
                9,
            ),
            None,
            &|_: u64, _: u64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_cancel_mid_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.msi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 16])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), temp.path());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = downloader
        .download(
            &asset(
                "AutoLogin-1.0.3.msi",
                format!("{}/download/AutoLogin-1.0.3.msi", server.uri()),
                16,
            ),
            None,
            &|_: u64, _: u64| {},
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UpdateError::Cancelled));
    assert!(files_in(temp.path()).is_empty());
}
