//! Resolver pipeline integration tests.
//!
//! These exercise the full Normalize -> Validate -> Fetch ->
//! MaybeConfirm -> MaybeRangeRetry -> Project pipeline against the
//! in-process upstream fixture, asserting both on what the caller gets
//! back and on the exact outbound requests the resolver issued.

use audio_relay::{RelayByteStream, RelayError, RelaySettings, Resolver};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use rstest::rstest;


use fixture::{UcMode, UpstreamFixture, CONFIRM_TOKEN, FILE_ID};

async fn collect(mut body: RelayByteStream) -> Bytes {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk.expect("body chunk"));
    }
    buf.freeze()
}

#[tokio::test]
async fn disallowed_host_is_rejected_without_outbound_fetch() {
    let fixture = UpstreamFixture::start(UcMode::DirectBinary).await;

    // Default settings do not allow 127.0.0.1.
    let resolver = Resolver::new(RelaySettings::default()).unwrap();
    let err = resolver
        .resolve(&fixture.url("/audio.m4a"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::HostNotAllowed(_)), "{err}");
    assert!(err.is_client_error());
    assert_eq!(fixture.hits(), 0, "validation must precede any fetch");
}

#[rstest]
#[case::not_a_url("not a url")]
#[case::relative("/just/a/path.mp3")]
#[case::bad_scheme("ftp://drive.google.com/uc?id=x")]
#[tokio::test]
async fn malformed_src_is_rejected_without_outbound_fetch(#[case] src: &str) {
    let resolver = Resolver::new(RelaySettings::default()).unwrap();
    let err = resolver.resolve(src, None, None).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidUrl), "{src}: {err}");
}

#[tokio::test]
async fn non_provider_host_gets_range_on_first_fetch() {
    let fixture = UpstreamFixture::start(UcMode::DirectBinary).await;
    let resolver = Resolver::new(fixture.settings()).unwrap();

    let media = resolver
        .resolve(
            &fixture.url("/audio.m4a"),
            Some("bytes=100-199"),
            Some("TestAgent/1.0"),
        )
        .await
        .unwrap();

    assert_eq!(fixture.hits(), 1, "no two-step dance for plain hosts");
    let requests = fixture.requests();
    assert_eq!(requests[0].range.as_deref(), Some("bytes=100-199"));
    assert_eq!(requests[0].user_agent.as_deref(), Some("TestAgent/1.0"));
    assert_eq!(
        requests[0].referer.as_deref(),
        Some("https://drive.google.com/")
    );

    assert_eq!(media.status.as_u16(), 206);
    assert_eq!(
        media.headers.get("content-range").unwrap(),
        "bytes 100-199/1024"
    );
    assert_eq!(collect(media.body).await, fixture.audio().slice(100..200));
}

#[tokio::test]
async fn provider_binary_response_triggers_late_range_retry() {
    let fixture = UpstreamFixture::start(UcMode::DirectBinary).await;
    let resolver = Resolver::new(fixture.provider_settings()).unwrap();

    let media = resolver
        .resolve(
            &fixture.url(&format!("/uc?export=download&id={FILE_ID}")),
            Some("bytes=0-99"),
            None,
        )
        .await
        .unwrap();

    let requests = fixture.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].range, None, "range withheld on first attempt");
    assert_eq!(requests[1].range.as_deref(), Some("bytes=0-99"));

    assert_eq!(media.status.as_u16(), 206);
    assert_eq!(collect(media.body).await, fixture.audio().slice(0..100));
}

#[tokio::test]
async fn provider_without_range_is_served_in_one_fetch() {
    let fixture = UpstreamFixture::start(UcMode::DirectBinary).await;
    let resolver = Resolver::new(fixture.provider_settings()).unwrap();

    let media = resolver
        .resolve(
            &fixture.url(&format!("/uc?export=download&id={FILE_ID}")),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(fixture.hits(), 1);
    assert_eq!(media.status.as_u16(), 200);
    // Inferred from the content-disposition filename over octet-stream.
    assert_eq!(media.headers.get("content-type").unwrap(), "audio/mp4");
    assert_eq!(media.headers.get("accept-ranges").unwrap(), "bytes");
    assert_eq!(media.headers.get("cache-control").unwrap(), "no-store");
    assert_eq!(collect(media.body).await, fixture.audio());
}

#[tokio::test]
async fn interstitial_confirmation_is_followed_with_cookies_and_range() {
    let fixture = UpstreamFixture::start(UcMode::Interstitial).await;
    let resolver = Resolver::new(fixture.provider_settings()).unwrap();

    let media = resolver
        .resolve(
            &fixture.url(&format!("/uc?export=download&id={FILE_ID}")),
            Some("bytes=0-99"),
            None,
        )
        .await
        .unwrap();

    let requests = fixture.requests();
    assert_eq!(requests.len(), 2, "exactly one confirmation follow-up");

    // First attempt: no range against the provider.
    assert_eq!(requests[0].range, None);

    // Follow-up: confirmation parameters, replayed cookie, caller range.
    let confirm = &requests[1];
    assert!(confirm.query.contains("export=download"), "{}", confirm.query);
    assert!(
        confirm.query.contains(&format!("id={FILE_ID}")),
        "{}",
        confirm.query
    );
    assert!(
        confirm.query.contains(&format!("confirm={CONFIRM_TOKEN}")),
        "{}",
        confirm.query
    );
    assert_eq!(
        confirm.cookie.as_deref(),
        Some("download_warning_146=TOKEN123")
    );
    assert_eq!(confirm.range.as_deref(), Some("bytes=0-99"));

    // The caller sees the confirmed response, not the interstitial.
    assert_eq!(media.status.as_u16(), 206);
    assert_eq!(media.headers.get("content-type").unwrap(), "audio/mp4");
    assert_eq!(collect(media.body).await, fixture.audio().slice(0..100));
}

#[tokio::test]
async fn interstitial_without_token_passes_html_through() {
    let fixture = UpstreamFixture::start(UcMode::InterstitialNoToken).await;
    let resolver = Resolver::new(fixture.provider_settings()).unwrap();

    let media = resolver
        .resolve(
            &fixture.url(&format!("/uc?export=download&id={FILE_ID}")),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(fixture.hits(), 1, "no follow-up without a token");
    assert_eq!(media.status.as_u16(), 200);
    // Degraded outcome: the caller must detect HTML by content-type.
    assert_eq!(
        media.headers.get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    assert!(media.headers.get("set-cookie").is_none());
    let body = collect(media.body).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("virus"));
}

#[tokio::test]
async fn upstream_headers_outside_the_projection_never_leak() {
    let fixture = UpstreamFixture::start(UcMode::DirectBinary).await;
    let resolver = Resolver::new(fixture.settings()).unwrap();

    let media = resolver
        .resolve(&fixture.url("/audio.m4a"), None, None)
        .await
        .unwrap();

    assert!(media.headers.get("set-cookie").is_none());
    assert!(media.headers.get("x-powered-by").is_none());
    assert_eq!(media.headers.get("cache-control").unwrap(), "no-store");
}
