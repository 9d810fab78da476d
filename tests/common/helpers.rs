#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use downpour::{Download, DownloaderBuilder, Status, Summary};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::TempDir;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Common test constants
pub const TEST_DOMAIN: &str = "http://domain.com/file.zip";
pub const TEST_USER_AGENT: &str = "downpour-test-agent";
pub const TEST_INTERVAL: Duration = Duration::from_millis(20);

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that a file holds exactly `expected`
pub fn assert_file_content(path: &Path, expected: &[u8]) {
    let content = fs::read(path).expect("Failed to read downloaded file");
    assert_eq!(content.len(), expected.len(), "File size mismatch at path: {:?}", path);
    assert!(content == expected, "File content mismatch at path: {:?}", path);
}

/// Creates test headers with common user agent
pub fn create_test_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(TEST_USER_AGENT));
    headers
}

// === Mock Server Helpers ===

/// Serves `body` at `route` for plain GET requests.
pub async fn mount_body(server: &MockServer, route: &str, body: Vec<u8>) {
    mount_body_with_delay(server, route, body, Duration::ZERO).await;
}

/// Serves `body` at `route` for plain GET requests after `delay`.
pub async fn mount_body_with_delay(
    server: &MockServer,
    route: &str,
    body: Vec<u8>,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answers the `Range: bytes=0-0` size probe for `route` with a partial
/// response announcing `total` bytes.
pub async fn mount_range_probe(server: &MockServer, route: &str, total: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("range", "bytes=0-0"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", format!("bytes 0-0/{}", total).as_str())
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(vec![0u8]),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

/// Fails the `Range: bytes=0-0` size probe for `route`.
pub async fn mount_failing_probe(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("range", "bytes=0-0"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Mounts a range probe and the body for `route`.
pub async fn mount_file(server: &MockServer, route: &str, body: Vec<u8>) {
    mount_range_probe(server, route, body.len() as u64).await;
    mount_body(server, route, body).await;
}

/// Creates a download of `route` on `server` into `dir`.
pub fn create_server_download(server: &MockServer, route: &str, dir: &Path) -> Download {
    let url = format!("{}{}", server.uri(), route);
    Download::try_from(url.as_str())
        .expect("Failed to create download")
        .in_directory(dir)
}

// === Downloader Helpers ===

/// A builder suited to local mock servers: range probes and fast sampling.
pub fn create_test_downloader_builder() -> DownloaderBuilder {
    DownloaderBuilder::new()
        .use_range_for_content_length(true)
        .progress_interval(TEST_INTERVAL)
}

/// Collects every summary handed to `on_complete`.
#[derive(Clone, Default)]
pub struct SummaryLog {
    summaries: Arc<Mutex<Vec<Summary>>>,
}

impl SummaryLog {
    /// Registers this log as the builder's completion callback.
    pub fn attach(&self, builder: DownloaderBuilder) -> DownloaderBuilder {
        let summaries = self.summaries.clone();
        builder.on_complete(move |summary| summaries.lock().unwrap().push(summary.clone()))
    }

    pub fn summaries(&self) -> Vec<Summary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.summaries()
            .into_iter()
            .map(|s| s.status().clone())
            .collect()
    }
}

/// Collects every line mirrored to the log sink.
#[derive(Clone, Default)]
pub struct LineLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LineLog {
    /// Registers this log as the builder's log sink.
    pub fn attach(&self, builder: DownloaderBuilder) -> DownloaderBuilder {
        let lines = self.lines.clone();
        builder.log_sink(move |line| lines.lock().unwrap().push(line.to_string()))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}

/// Drains a progress stream until it is closed, skipping lag notices.
pub async fn collect_stream<T: Clone>(mut rx: Receiver<T>) -> Vec<T> {
    let mut values = Vec::new();
    loop {
        match rx.recv().await {
            Ok(v) => values.push(v),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return values,
        }
    }
}

/// Content range headers and their expected totals.
pub fn create_test_content_range_headers() -> Vec<(&'static str, Option<u64>)> {
    vec![
        ("bytes 0-0/2048", Some(2048)),
        ("bytes 0-1023/1048576", Some(1048576)),
        ("bytes 200-1000/67589", Some(67589)),
        ("bytes 0-0/*", None),
        ("invalid", None),
    ]
}
