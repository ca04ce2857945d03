//! In-process HTTP fixture for engine tests.
//!
//! Every body is the same deterministic pattern (`byte[i] = i % 251`) so a
//! finished file can be checked byte for byte.

#![allow(dead_code)]

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::Stream;
use futures_util::stream;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeFile;

use ucd_download::{
    DownloadEvent, DownloadManagerConfig, DownloadManagerDeps, DownloadManagerImpl,
    DownloadUpdate, TaskId, TaskStatus, build_download_manager,
};
use ucd_core::{FixedDownloadRoot, NoopDownloadEmitter};

/// Size of the static file served from disk.
pub const FILE_LEN: u64 = 10_000_000;
/// Size of every generated (handler-served) body.
pub const RANGED_LEN: u64 = 4 * 1024 * 1024;
/// Size of the unknown-length stream.
pub const STREAM_LEN: u64 = 1024 * 1024;

const CHUNK: u64 = 16 * 1024;
const SLOW_DELAY: Duration = Duration::from_millis(10);
/// How long `/slow-head` takes to answer `HEAD`.
pub const HEAD_STALL: Duration = Duration::from_secs(2);

/// Expected content of `len` bytes starting at `start`.
pub fn pattern(start: u64, len: u64) -> Vec<u8> {
    (start..start + len).map(|i| (i % 251) as u8).collect()
}

#[derive(Clone, Default)]
struct AppState {
    ranged_gets: Arc<AtomicUsize>,
    seen_starts: Arc<Mutex<HashSet<u64>>>,
}

/// A running fixture server.
pub struct Fixture {
    base: String,
    ranged_gets: Arc<AtomicUsize>,
    _files: TempDir,
}

impl Fixture {
    /// URL for a fixture path such as `/files/game.bin`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Number of GET requests that carried a `Range` header.
    pub fn ranged_gets(&self) -> usize {
        self.ranged_gets.load(Ordering::SeqCst)
    }
}

/// Start the fixture on an ephemeral port.
///
/// Routes:
/// - `/files/game.bin`, `/files/empty.bin` - static files (HEAD + Range)
/// - `/slow/game.bin` - ranged, paced body (for cancel and pause)
/// - `/stream/game.bin` - no length, no ranges, HEAD not allowed
/// - `/no-range/game.bin` - advertises ranges but always answers 200
/// - `/flaky/game.bin` - 500 for every range not starting at 0
/// - `/retry-once/game.bin` - 500 the first time each range start is seen
/// - `/truncated/game.bin` - ranged answers end halfway
/// - `/slow-head/game.bin` - `HEAD` stalls for `HEAD_STALL`; GET streams like `/stream`
/// - `/misaligned/game.bin` - 206 answers start one byte after the requested range
pub async fn serve() -> Fixture {
    let files = TempDir::new().unwrap();
    let game = files.path().join("game.bin");
    let empty = files.path().join("empty.bin");
    std::fs::write(&game, pattern(0, FILE_LEN)).unwrap();
    std::fs::write(&empty, b"").unwrap();

    let state = AppState::default();
    let ranged_gets = Arc::clone(&state.ranged_gets);

    let app = Router::new()
        .route_service("/files/game.bin", ServeFile::new(&game))
        .route_service("/files/empty.bin", ServeFile::new(&empty))
        .route("/slow/game.bin", get(slow).head(head_ranged))
        .route("/stream/game.bin", get(unknown_length).head(head_not_allowed))
        .route("/no-range/game.bin", get(ignore_range).head(head_ranged))
        .route("/flaky/game.bin", get(flaky).head(head_ranged))
        .route("/retry-once/game.bin", get(retry_once).head(head_ranged))
        .route("/truncated/game.bin", get(truncated).head(head_ranged))
        .route("/slow-head/game.bin", get(unknown_length).head(head_stalled))
        .route("/misaligned/game.bin", get(misaligned).head(head_ranged))
        .layer(middleware::from_fn_with_state(state.clone(), count_ranged))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Fixture {
        base: format!("http://{addr}"),
        ranged_gets,
        _files: files,
    }
}

async fn count_ranged(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.headers().contains_key(header::RANGE) {
        state.ranged_gets.fetch_add(1, Ordering::SeqCst);
    }
    next.run(request).await
}

fn parse_range(headers: &HeaderMap) -> Option<(u64, u64)> {
    let value = headers.get(header::RANGE)?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn pattern_stream(
    start: u64,
    end: u64,
    delay: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::unfold(start, move |pos| async move {
        if pos > end {
            return None;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let len = CHUNK.min(end - pos + 1);
        Some((Ok(Bytes::from(pattern(pos, len))), pos + len))
    })
}

fn partial(start: u64, end: u64, sent_end: u64, delay: Duration) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_RANGE,
            format!("bytes {start}-{end}/{RANGED_LEN}"),
        );
    if sent_end == end {
        builder = builder.header(header::CONTENT_LENGTH, end - start + 1);
    }
    builder
        .body(Body::from_stream(pattern_stream(start, sent_end, delay)))
        .unwrap()
}

fn full(delay: Duration) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, RANGED_LEN)
        .body(Body::from_stream(pattern_stream(0, RANGED_LEN - 1, delay)))
        .unwrap()
}

fn ranged(headers: &HeaderMap, delay: Duration) -> Response {
    match parse_range(headers) {
        Some((start, end)) => partial(start, end, end, delay),
        None => full(delay),
    }
}

async fn head_ranged() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, RANGED_LEN)
        .body(Body::empty())
        .unwrap()
}

async fn head_stalled() -> Response {
    tokio::time::sleep(HEAD_STALL).await;
    head_ranged().await
}

async fn head_not_allowed() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

async fn slow(headers: HeaderMap) -> Response {
    ranged(&headers, SLOW_DELAY)
}

async fn unknown_length() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::from_stream(pattern_stream(0, STREAM_LEN - 1, SLOW_DELAY)))
        .unwrap()
}

async fn ignore_range() -> Response {
    full(Duration::ZERO)
}

async fn flaky(headers: HeaderMap) -> Response {
    match parse_range(&headers) {
        Some((start, _)) if start > 0 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => ranged(&headers, Duration::ZERO),
    }
}

async fn retry_once(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some((start, _)) = parse_range(&headers) {
        let first_time = state.seen_starts.lock().unwrap().insert(start);
        if first_time {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }
    ranged(&headers, Duration::ZERO)
}

async fn truncated(headers: HeaderMap) -> Response {
    match parse_range(&headers) {
        Some((start, end)) => partial(start, end, start + (end - start) / 2, Duration::ZERO),
        None => full(Duration::ZERO),
    }
}

async fn misaligned(headers: HeaderMap) -> Response {
    let Some((start, end)) = parse_range(&headers) else {
        return full(Duration::ZERO);
    };
    let shifted = start + 1;
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_RANGE,
            format!("bytes {shifted}-{end}/{RANGED_LEN}"),
        )
        .header(header::CONTENT_LENGTH, end - shifted + 1)
        .body(Body::from_stream(pattern_stream(shifted, end, Duration::ZERO)))
        .unwrap()
}

/// Engine tuned for fast tests: 1 MiB segments, quick progress events.
pub fn test_config() -> DownloadManagerConfig {
    DownloadManagerConfig::default()
        .with_min_chunk_bytes(1024 * 1024)
        .with_max_concurrency(4)
        .with_progress_interval(Duration::from_millis(20))
        .with_probe_timeout(Duration::from_secs(5))
}

/// Build a manager writing under `root`.
pub fn manager(root: &Path, config: DownloadManagerConfig) -> DownloadManagerImpl {
    build_download_manager(DownloadManagerDeps {
        root_provider: Arc::new(FixedDownloadRoot::new(root)),
        event_emitter: Arc::new(NoopDownloadEmitter::new()),
        config,
    })
    .unwrap()
}

async fn recv(rx: &mut broadcast::Receiver<DownloadEvent>) -> DownloadEvent {
    loop {
        match tokio::time::timeout(Duration::from_secs(30), rx.recv()).await {
            Ok(Ok(event)) => return event,
            Ok(Err(RecvError::Lagged(_))) => {}
            Ok(Err(RecvError::Closed)) => panic!("event channel closed"),
            Err(_) => panic!("timed out waiting for an event"),
        }
    }
}

/// Collect events for `id` until its terminal status (inclusive).
pub async fn until_terminal(
    rx: &mut broadcast::Receiver<DownloadEvent>,
    id: &TaskId,
) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    loop {
        let event = recv(rx).await;
        if event.task_id() != id {
            continue;
        }
        let terminal = matches!(
            &event,
            DownloadEvent::StatusChanged { update } if update.status.is_terminal()
        );
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Wait for the first progress event of `id` with at least `min_bytes`.
pub async fn progress_at_least(
    rx: &mut broadcast::Receiver<DownloadEvent>,
    id: &TaskId,
    min_bytes: u64,
) -> (Vec<DownloadEvent>, DownloadUpdate) {
    let mut seen = Vec::new();
    loop {
        let event = recv(rx).await;
        if event.task_id() != id {
            continue;
        }
        seen.push(event.clone());
        if let DownloadEvent::Progress { update } = event {
            if update.received_bytes >= min_bytes {
                return (seen, update);
            }
        }
    }
}

/// Status sequence in `events`.
pub fn statuses(events: &[DownloadEvent]) -> Vec<TaskStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            DownloadEvent::StatusChanged { update } => Some(update.status),
            _ => None,
        })
        .collect()
}

/// Final record in `events`.
pub fn terminal(events: &[DownloadEvent]) -> DownloadUpdate {
    events
        .iter()
        .rev()
        .find_map(|e| match e {
            DownloadEvent::StatusChanged { update } if update.status.is_terminal() => {
                Some(update.clone())
            }
            _ => None,
        })
        .expect("no terminal status")
}
