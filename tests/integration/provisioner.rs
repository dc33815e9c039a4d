//! The standard browser strategy chain against real directories.

use autologin_updater::browser::layout::executable_in_build;
use autologin_updater::browser::{AttemptOutcome, BrowserProvisioner, StrategyId};
use autologin_updater::config::{BROWSER_PATH_ENV, BrowserConfig};
use autologin_updater::constants::BROWSERS_DIR_NAME;
use autologin_updater::core::UpdateError;
use autologin_updater::release::Platform;
use autologin_updater::utils::platform::{DATA_DIR_ENV, make_executable};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Points the data directory at a fresh temp dir for the lifetime of the guard.
struct DataDir {
    dir: TempDir,
}

impl DataDir {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        unsafe {
            std::env::set_var(DATA_DIR_ENV, dir.path());
            std::env::remove_var(BROWSER_PATH_ENV);
        }
        Self { dir }
    }

    fn browsers(&self) -> PathBuf {
        self.dir.path().join(BROWSERS_DIR_NAME)
    }
}

impl Drop for DataDir {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
            std::env::remove_var(BROWSER_PATH_ENV);
        }
    }
}

fn stage_build(browsers: &Path, revision: u32) -> PathBuf {
    let exe = browsers
        .join(format!("chromium-{revision}"))
        .join(executable_in_build(Platform::Linux));
    std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
    std::fs::write(&exe, b"chromium").unwrap();
    make_executable(&exe).unwrap();
    exe
}

fn failing_install() -> BrowserConfig {
    BrowserConfig {
        install_command: Some(vec!["sh".into(), "-c".into(), "echo offline >&2; exit 1".into()]),
        ..BrowserConfig::default()
    }
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_installed_build_found_without_network() {
    let data = DataDir::new();
    stage_build(&data.browsers(), 1140);
    let newest = stage_build(&data.browsers(), 1148);

    let report = BrowserProvisioner::for_platform(&failing_install(), Platform::Linux)
        .ensure_present(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.binary.executable, newest);
    assert_eq!(report.binary.method, StrategyId::InstalledBrowsers);
    assert_eq!(report.binary.env(), vec![("PLAYWRIGHT_BROWSERS_PATH", data.browsers())]);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Skipped);
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_custom_path_env_wins() {
    let data = DataDir::new();
    stage_build(&data.browsers(), 1148);

    let custom = TempDir::new().unwrap();
    let exe = custom.path().join("chromium");
    std::fs::write(&exe, b"#!/bin/sh\n").unwrap();
    make_executable(&exe).unwrap();
    unsafe { std::env::set_var(BROWSER_PATH_ENV, &exe) };

    let report = BrowserProvisioner::for_platform(&BrowserConfig::default(), Platform::Linux)
        .ensure_present(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.binary.executable, exe);
    assert_eq!(report.binary.method, StrategyId::CustomPath);
    assert_eq!(report.attempts.len(), 1);
    assert!(report.binary.env().is_empty());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_network_install_populates_data_dir() {
    let data = DataDir::new();
    let config = BrowserConfig {
        install_command: Some(vec![
            "sh".into(),
            "-c".into(),
            "mkdir -p \"$PLAYWRIGHT_BROWSERS_PATH/chromium-1200/chrome-linux\" && \
             echo chrome > \"$PLAYWRIGHT_BROWSERS_PATH/chromium-1200/chrome-linux/chrome\""
                .into(),
        ]),
        ..BrowserConfig::default()
    };

    let report = BrowserProvisioner::for_platform(&config, Platform::Linux)
        .ensure_present(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.binary.method, StrategyId::NetworkInstall);
    assert!(report.binary.executable.starts_with(data.browsers()));
    assert_eq!(report.attempts.last().map(|a| a.outcome), Some(AttemptOutcome::Success));

    // The next run finds the installed build without installing again
    let report = BrowserProvisioner::for_platform(&failing_install(), Platform::Linux)
        .ensure_present(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.binary.method, StrategyId::InstalledBrowsers);
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_everything_fails_with_history() {
    let _data = DataDir::new();

    let err = BrowserProvisioner::for_platform(&failing_install(), Platform::Linux)
        .ensure_present(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        UpdateError::BrowserUnavailable { attempts } => {
            let methods: Vec<_> = attempts.iter().map(|a| a.method).collect();
            assert_eq!(
                methods,
                vec![
                    StrategyId::CustomPath,
                    StrategyId::InstalledBrowsers,
                    StrategyId::PrestagedBrowsers,
                    StrategyId::NetworkInstall,
                ]
            );
            assert!(attempts.iter().all(|a| a.outcome != AttemptOutcome::Success));
            assert!(attempts[3].detail.contains("offline"), "{}", attempts[3]);
        }
        other => panic!("expected BrowserUnavailable, got {other:?}"),
    }
}
