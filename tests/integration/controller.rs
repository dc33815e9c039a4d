//! The update controller driven end to end over HTTP.

use super::{LATEST_PATH, mount_asset, mount_latest, release_for_all_platforms, repository};
use autologin_updater::core::ErrorKind;
use autologin_updater::download::{ChecksumVerifier, Downloader};
use autologin_updater::release::{Platform, ReleaseClient};
use autologin_updater::test_utils::{RecordingLauncher, ReleaseFixture, init_test_logging};
use autologin_updater::update::{UpdateController, UpdateState};
use autologin_updater::version::{SemVer, VersionResolver};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    controller: UpdateController,
    launcher: RecordingLauncher,
    download_dir: TempDir,
}

fn harness(server: &MockServer, running: &str) -> Harness {
    let client = ReleaseClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_max_retries(0);
    let download_dir = TempDir::new().unwrap();
    let launcher = RecordingLauncher::new();
    let controller = UpdateController::builder(client.clone(), repository())
        .platform(Platform::Linux)
        .resolver(VersionResolver::new(None, running))
        .downloader(Downloader::new(client.http().clone(), download_dir.path()))
        .launcher(launcher.clone())
        .build()
        .unwrap();
    Harness {
        controller,
        launcher,
        download_dir,
    }
}

#[tokio::test]
async fn test_newer_release_is_available() {
    init_test_logging(None);
    let server = MockServer::start().await;
    mount_latest(&server, release_for_all_platforms(&server, "v1.0.3").to_json(), 1).await;

    let h = harness(&server, "1.0.2");
    match h.controller.check().await {
        UpdateState::UpdateAvailable(info) => {
            assert_eq!(info.current, SemVer::new(1, 0, 2));
            assert_eq!(info.latest, SemVer::new(1, 0, 3));
            assert_eq!(info.asset.name, "AutoLogin-1.0.3.AppImage");
            assert_eq!(info.notes, "Bug fixes");
        }
        other => panic!("expected UpdateAvailable, got {other}"),
    }
}

#[tokio::test]
async fn test_same_release_is_no_update() {
    let server = MockServer::start().await;
    mount_latest(&server, release_for_all_platforms(&server, "v1.0.2").to_json(), 1).await;

    let h = harness(&server, "1.0.2");
    assert_eq!(
        h.controller.check().await,
        UpdateState::NoUpdate {
            current: SemVer::new(1, 0, 2),
            latest: SemVer::new(1, 0, 2),
        }
    );
}

#[tokio::test]
async fn test_older_release_is_no_update() {
    let server = MockServer::start().await;
    mount_latest(&server, release_for_all_platforms(&server, "v1.0.1").to_json(), 1).await;

    let h = harness(&server, "1.0.2");
    assert!(matches!(h.controller.check().await, UpdateState::NoUpdate { .. }));
}

#[tokio::test]
async fn test_second_check_while_checking_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(release_for_all_platforms(&server, "v1.0.3").to_json())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "1.0.2");
    let mut states = h.controller.subscribe();
    let first = h.controller.spawn_check();

    states.wait_for(|s| *s == UpdateState::Checking).await.unwrap();
    assert_eq!(h.controller.check().await, UpdateState::Checking);

    assert!(matches!(first.await.unwrap(), UpdateState::UpdateAvailable(_)));
}

#[tokio::test]
async fn test_unparseable_tag_fails_check() {
    let server = MockServer::start().await;
    mount_latest(&server, ReleaseFixture::new("nightly").to_json(), 1).await;

    let h = harness(&server, "1.0.2");
    match h.controller.check().await {
        UpdateState::Failed(failure) => assert_eq!(failure.kind, ErrorKind::MalformedVersion),
        other => panic!("expected Failed, got {other}"),
    }
}

#[tokio::test]
async fn test_missing_platform_asset_points_at_releases_page() {
    let server = MockServer::start().await;
    let release = ReleaseFixture::new("v1.0.3")
        .asset("AutoLogin-1.0.3.msi", 4, "http://localhost/a.msi")
        .to_json();
    mount_latest(&server, release, 1).await;

    let h = harness(&server, "1.0.2");
    match h.controller.check().await {
        UpdateState::Failed(failure) => {
            assert_eq!(failure.kind, ErrorKind::AssetNotFoundForPlatform);
            assert!(
                failure.detail.contains("https://github.com/TradinxLite/autologin/releases/latest"),
                "{}",
                failure.detail
            );
        }
        other => panic!("expected Failed, got {other}"),
    }
}

#[tokio::test]
async fn test_registry_failure_recorded_in_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, "1.0.2");
    match h.controller.check().await {
        UpdateState::Failed(failure) => assert_eq!(failure.kind, ErrorKind::NotFound),
        other => panic!("expected Failed, got {other}"),
    }

    // A failed check can be retried
    server.reset().await;
    mount_latest(&server, release_for_all_platforms(&server, "v1.0.2").to_json(), 1).await;
    assert!(matches!(h.controller.check().await, UpdateState::NoUpdate { .. }));
}

#[tokio::test]
async fn test_download_verify_and_launch() {
    let server = MockServer::start().await;
    let body = b"ELF-appimage".to_vec();
    let url = mount_asset(&server, "AutoLogin-1.0.3.AppImage", body.clone()).await;

    let mut digest = ChecksumVerifier::new();
    digest.update(&body);
    let sidecar = format!("{}  AutoLogin-1.0.3.AppImage\n", digest.finalize_hex());
    let sidecar_url = mount_asset(&server, "AutoLogin-1.0.3.AppImage.sha256", sidecar.into_bytes()).await;

    let release = ReleaseFixture::new("v1.0.3")
        .asset("AutoLogin-1.0.3.AppImage", body.len() as u64, &url)
        .asset("AutoLogin-1.0.3.AppImage.sha256", 0, &sidecar_url)
        .to_json();
    mount_latest(&server, release, 1).await;

    let h = harness(&server, "1.0.2");
    let mut states = h.controller.subscribe();
    let progress = tokio::spawn(async move {
        let mut saw_downloading = false;
        while states.changed().await.is_ok() {
            match &*states.borrow_and_update() {
                UpdateState::Downloading { .. } => saw_downloading = true,
                UpdateState::Downloaded { .. } => break,
                _ => {}
            }
        }
        saw_downloading
    });

    assert!(matches!(h.controller.check().await, UpdateState::UpdateAvailable(_)));

    let path = match h.controller.download().await {
        UpdateState::Downloaded { path, .. } => path,
        other => panic!("expected Downloaded, got {other}"),
    };
    assert_eq!(path, h.download_dir.path().join("AutoLogin-1.0.3.AppImage"));
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert!(progress.await.unwrap(), "subscriber never saw Downloading");

    assert_eq!(h.controller.launch(), UpdateState::Launching { path: path.clone() });
    assert_eq!(h.launcher.launched(), vec![path]);
}

/// A release whose AppImage has a matching `.sha256` sidecar served by `sidecar`.
async fn release_with_sidecar(server: &MockServer, body: &[u8], sidecar: ResponseTemplate) -> serde_json::Value {
    let url = mount_asset(server, "AutoLogin-1.0.3.AppImage", body.to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.AppImage.sha256"))
        .respond_with(sidecar)
        .mount(server)
        .await;

    ReleaseFixture::new("v1.0.3")
        .asset("AutoLogin-1.0.3.AppImage", body.len() as u64, &url)
        .asset(
            "AutoLogin-1.0.3.AppImage.sha256",
            0,
            &format!("{}/download/AutoLogin-1.0.3.AppImage.sha256", server.uri()),
        )
        .to_json()
}

fn sidecar_for(body: &[u8]) -> String {
    let mut digest = ChecksumVerifier::new();
    digest.update(body);
    format!("{}  AutoLogin-1.0.3.AppImage\n", digest.finalize_hex())
}

#[tokio::test]
async fn test_transient_sidecar_failure_is_retried() {
    let server = MockServer::start().await;
    let body = b"ELF-appimage".to_vec();

    // First sidecar request fails, later ones fall through to the 200 below
    Mock::given(method("GET"))
        .and(path("/download/AutoLogin-1.0.3.AppImage.sha256"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    let release = release_with_sidecar(
        &server,
        &body,
        ResponseTemplate::new(200).set_body_string(sidecar_for(&body)),
    )
    .await;
    mount_latest(&server, release, 1).await;

    let h = harness(&server, "1.0.2");
    assert!(matches!(h.controller.check().await, UpdateState::UpdateAvailable(_)));
    match h.controller.download().await {
        UpdateState::Downloaded { path, .. } => assert_eq!(std::fs::read(path).unwrap(), body),
        other => panic!("expected Downloaded, got {other}"),
    }
}

#[tokio::test]
async fn test_cancel_during_sidecar_fetch() {
    let server = MockServer::start().await;
    let body = b"ELF-appimage".to_vec();
    let release = release_with_sidecar(
        &server,
        &body,
        ResponseTemplate::new(200)
            .set_body_string(sidecar_for(&body))
            .set_delay(Duration::from_secs(10)),
    )
    .await;
    mount_latest(&server, release, 1).await;

    let h = harness(&server, "1.0.2");
    h.controller.check().await;

    let mut states = h.controller.subscribe();
    let controller = h.controller.clone();
    let download = tokio::spawn(async move { controller.download().await });
    states
        .wait_for(|s| matches!(s, UpdateState::Downloading { .. }))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.controller.cancel();
    let state = tokio::time::timeout(Duration::from_secs(2), download)
        .await
        .expect("cancel did not interrupt the sidecar request")
        .unwrap();
    assert_eq!(state, UpdateState::Idle);
    assert!(!h.download_dir.path().join("AutoLogin-1.0.3.AppImage").exists());
}

#[tokio::test]
async fn test_integrity_failure_keeps_running_version() {
    let server = MockServer::start().await;
    let url = mount_asset(&server, "AutoLogin-1.0.3.AppImage", vec![0u8; 10]).await;
    let release = ReleaseFixture::new("v1.0.3")
        .asset("AutoLogin-1.0.3.AppImage", 4096, &url)
        .to_json();
    mount_latest(&server, release, 1).await;

    let h = harness(&server, "1.0.2");
    h.controller.check().await;
    match h.controller.download().await {
        UpdateState::Failed(failure) => assert_eq!(failure.kind, ErrorKind::DownloadIntegrity),
        other => panic!("expected Failed, got {other}"),
    }

    assert!(std::fs::read_dir(h.download_dir.path()).unwrap().next().is_none());
    assert_eq!(h.controller.launch().name(), "failed");
    assert!(h.launcher.launched().is_empty());
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let server = MockServer::start().await;
    let url = mount_asset(&server, "AutoLogin-1.0.3.AppImage", b"data".to_vec()).await;
    let release = ReleaseFixture::new("v1.0.3")
        .asset("AutoLogin-1.0.3.AppImage", 4, &url)
        .to_json();
    mount_latest(&server, release, 1).await;

    let client = ReleaseClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let download_dir = TempDir::new().unwrap();
    let controller = UpdateController::builder(client.clone(), repository())
        .platform(Platform::Linux)
        .resolver(VersionResolver::new(None, "1.0.2"))
        .downloader(Downloader::new(client.http().clone(), download_dir.path()))
        .launcher(RecordingLauncher::failing())
        .build()
        .unwrap();

    controller.check().await;
    controller.download().await;
    match controller.launch() {
        UpdateState::Failed(failure) => assert_eq!(failure.kind, ErrorKind::InstallerLaunch),
        other => panic!("expected Failed, got {other}"),
    }
}

#[tokio::test]
async fn test_cancelled_check_returns_to_idle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(release_for_all_platforms(&server, "v1.0.3").to_json())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let h = harness(&server, "1.0.2");
    let mut states = h.controller.subscribe();
    let check = h.controller.spawn_check();
    states.wait_for(|s| *s == UpdateState::Checking).await.unwrap();

    h.controller.cancel();
    assert_eq!(check.await.unwrap(), UpdateState::Idle);
}
