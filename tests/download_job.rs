mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{app_config, dir_listing, ConnectBehavior, FakeConnector, MemoryFs};
use sftpcron_lib::config::OverlapPolicy;
use sftpcron_lib::job::DownloadJob;
use sftpcron_lib::sftp::{RunResult, TransferStatus};
use sftpcron_lib::ssh::{RetryConfig, SshError};
use tempfile::tempdir;

#[tokio::test]
async fn test_successful_run_fetches_and_closes() {
    let out = tempdir().unwrap();
    let fs = MemoryFs::new()
        .with_file("/data/a.txt", b"alpha")
        .with_file("/data/b.txt", b"bravo");
    let connector = FakeConnector::new(fs);
    let config = app_config(&["/data/a.txt", "/data/b.txt"], out.path());
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let result = job.run_once().await;

    assert!(result.is_success());
    let outcomes = result.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].local_path, out.path().join("a.txt"));
    assert_eq!(outcomes[1].local_path, out.path().join("b.txt"));
    assert_eq!(std::fs::read(out.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(out.path().join("b.txt")).unwrap(), b"bravo");
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn test_session_closed_after_partial_failure() {
    let out = tempdir().unwrap();
    let fs = MemoryFs::new().with_file("/data/b.txt", b"bravo");
    let connector = FakeConnector::new(fs);
    let config = app_config(&["/missing.txt", "/data/b.txt"], out.path());
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let result = job.run_once().await;

    assert_eq!(result.outcomes().len(), 1);
    assert_eq!(result.outcomes()[0].status, TransferStatus::OpenFailed);
    assert!(!out.path().join("b.txt").exists());
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn test_empty_file_list_skips_connect() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::failing(ConnectBehavior::Refuse);
    let job = DownloadJob::new(Arc::new(app_config(&[], out.path())), connector.clone());

    let result = job.run_once().await;

    assert!(result.connection_error().is_none());
    assert!(result.outcomes().is_empty());
    assert!(matches!(result, RunResult::Completed(_)));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_refused_connection_produces_no_outcomes() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::failing(ConnectBehavior::Refuse);
    let config = app_config(&["/data/a.txt"], out.path());
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let result = job.run_once().await;

    assert!(matches!(
        result.connection_error(),
        Some(SshError::ConnectionFailed(_))
    ));
    assert!(result.outcomes().is_empty());
    assert!(dir_listing(out.path()).is_empty());
    assert_eq!(connector.closes(), 0);
}

#[tokio::test]
async fn test_rejected_credentials_produce_no_outcomes() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::failing(ConnectBehavior::RejectCredentials);
    let mut config = app_config(&["/data/a.txt"], out.path());
    config.connection.connect_retries = 3;
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let result = job.run_once().await;

    assert!(matches!(
        result.connection_error(),
        Some(SshError::AuthenticationFailed(_))
    ));
    assert!(dir_listing(out.path()).is_empty());
    // Authentication failures are never retried.
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_refused_connection_is_retried_when_configured() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::failing(ConnectBehavior::Refuse);
    let mut config = app_config(&["/data/a.txt"], out.path());
    config.connection.connect_retries = 2;
    let job = DownloadJob::new(Arc::new(config), connector.clone())
        .with_retry(RetryConfig::new(2).with_backoff(0, 2.0, 0));

    let result = job.run_once().await;

    assert!(result.connection_error().is_some());
    assert_eq!(connector.connects(), 3);
}

#[tokio::test]
async fn test_overlapping_runs_race_on_same_local_file() {
    let out = tempdir().unwrap();
    let first = FakeConnector::new(MemoryFs::new().with_file("/data/shared.txt", b"first-run!"));
    let second = FakeConnector::new(MemoryFs::new().with_file("/data/shared.txt", b"second-run"));

    let job_a = DownloadJob::new(
        Arc::new(app_config(&["/data/shared.txt"], out.path())),
        first,
    );
    let job_b = DownloadJob::new(
        Arc::new(app_config(&["/data/shared.txt"], out.path())),
        second,
    );

    let (a, b) = tokio::join!(job_a.run_once(), job_b.run_once());

    assert!(a.is_success());
    assert!(b.is_success());
    assert_eq!(a.outcomes()[0].local_path, b.outcomes()[0].local_path);
    // No ordering between runs: either write may land last. Equal-length
    // bodies keep the result one of the two rather than a blend.
    let content = std::fs::read(out.path().join("shared.txt")).unwrap();
    assert!(
        content == b"first-run!" || content == b"second-run",
        "unexpected content {:?}",
        String::from_utf8_lossy(&content)
    );
}

#[tokio::test]
async fn test_overlap_allow_runs_concurrently() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::new(MemoryFs::new().with_file("/data/a.txt", b"alpha"))
        .with_delay(Duration::from_millis(100));
    let config = app_config(&["/data/a.txt"], out.path());
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let (a, b) = tokio::join!(job.run_once(), job.run_once());

    assert!(a.is_success());
    assert!(b.is_success());
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn test_overlap_skip_drops_second_firing() {
    let out = tempdir().unwrap();
    let connector = FakeConnector::new(MemoryFs::new().with_file("/data/a.txt", b"alpha"))
        .with_delay(Duration::from_millis(100));
    let mut config = app_config(&["/data/a.txt"], out.path());
    config.transfer.overlap = OverlapPolicy::Skip;
    let job = DownloadJob::new(Arc::new(config), connector.clone());

    let (a, b) = tokio::join!(job.run_once(), job.run_once());

    assert!(a.is_success());
    assert!(matches!(b, RunResult::Skipped));
    assert_eq!(connector.connects(), 1);

    // Slot is free again once the first run finished.
    assert!(job.run_once().await.is_success());
    assert_eq!(connector.connects(), 2);
}
