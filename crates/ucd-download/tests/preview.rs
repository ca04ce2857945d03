//! Preview image fetching against the fixture server.

mod common;

use common::{STREAM_LEN, pattern, serve};
use ucd_core::PreviewFetcher;
use ucd_download::{DownloadError, ReqwestPreviewFetcher, build_client};

fn fetcher() -> ReqwestPreviewFetcher {
    ReqwestPreviewFetcher::new(build_client(&common::test_config()).unwrap())
}

#[tokio::test]
async fn body_without_length_is_read_in_full_under_the_cap() {
    let fixture = serve().await;

    let body = fetcher().fetch(&fixture.url("/stream/game.bin")).await.unwrap();

    assert_eq!(body.len() as u64, STREAM_LEN);
    assert_eq!(body, pattern(0, STREAM_LEN));
}

#[tokio::test]
async fn chunked_body_over_the_cap_is_rejected() {
    let fixture = serve().await;

    let err = fetcher()
        .with_max_bytes(64 * 1024)
        .fetch(&fixture.url("/stream/game.bin"))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Other { .. }), "{err:?}");
    assert!(err.to_string().contains("65536"));
}

#[tokio::test]
async fn declared_length_over_the_cap_is_rejected() {
    let fixture = serve().await;

    let err = fetcher()
        .with_max_bytes(1024 * 1024)
        .fetch(&fixture.url("/files/game.bin"))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Other { .. }), "{err:?}");
}

#[tokio::test]
async fn error_status_keeps_its_code() {
    let fixture = serve().await;

    let err = fetcher()
        .fetch(&fixture.url("/missing.png"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Network {
            status_code: Some(404),
            ..
        }
    ));
}
