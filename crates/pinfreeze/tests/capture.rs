// ABOUTME: Integration tests for capture through the public API.
// ABOUTME: Covers loopback fallback, error severities and the capture -> pin -> snapshot flow.

use httpmock::prelude::*;
use pinfreeze_core::pin::PinUpdate;
use pinfreeze_core::{
    save_post_pin, Client, ErrorCode, FetchOrigin, History, MemorySnapshotStore, PostPin,
    SelectorContract, Settings,
};
use pretty_assertions::assert_eq;

const PAGE: &str = r#"<html><body>
<main id="content">
  <h1>Landing</h1>
  <p>Welcome</p>
</main>
</body></html>"#;

fn client_for(local: &MockServer) -> Client {
    Client::builder()
        .loopback_host(format!("127.0.0.1:{}", local.port()))
        .build()
}

#[tokio::test]
async fn fallback_capture_forwards_original_host() {
    let remote = MockServer::start();
    let local = MockServer::start();

    remote.mock(|when, then| {
        when.method(GET).path("/landing");
        then.status(502);
    });
    let fallback = local.mock(|when, then| {
        when.method(GET)
            .path("/landing")
            .query_param("preview", "1")
            .header("host", "127.0.0.1")
            .header("x-forwarded-host", "127.0.0.1")
            .header("x-forwarded-proto", "http");
        then.status(200).body(PAGE);
    });

    let client = client_for(&local);
    let result = client
        .capture(&remote.url("/landing?preview=1"), &SelectorContract::tag("h1").unwrap())
        .await
        .expect("fallback capture should succeed");

    fallback.assert();
    assert_eq!(result.origin, FetchOrigin::LocalFallback);
    assert_eq!(result.html, "Landing");
}

#[tokio::test]
async fn extraction_errors_carry_422() {
    let remote = MockServer::start();
    remote.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(r#"<div id="content">   </div>"#);
    });

    let client = Client::builder().build();
    let err = client
        .capture(&remote.url("/"), &SelectorContract::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SelectorEmpty);
    assert_eq!(err.http_status(), 422);
}

#[tokio::test]
async fn network_failure_carries_both_attempts() {
    let remote = MockServer::start();
    let local = MockServer::start();
    remote.mock(|when, then| {
        when.method(GET).path("/");
        then.status(500);
    });
    local.mock(|when, then| {
        when.method(GET).path("/");
        then.status(503);
    });

    let client = client_for(&local);
    let err = client
        .capture(&remote.url("/"), &SelectorContract::default())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::NetworkFailure);
    assert_eq!(err.http_status(), 500);
    let fetch = err.fetch.as_ref().expect("fetch failure details");
    assert_eq!(fetch.primary, "HTTP 500");
    assert_eq!(fetch.fallback, "HTTP 503");
}

#[tokio::test]
async fn corrupt_settings_capture_with_default_selector() {
    let remote = MockServer::start();
    remote.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(PAGE);
    });

    let settings = Settings {
        capture_selector_type: Some("id".to_string()),
        capture_selector_value: Some("not valid!".to_string()),
        ..Default::default()
    };

    let client = Client::builder().build();
    let result = client.capture(&remote.url("/"), &settings).await.unwrap();
    assert_eq!(result.selector, SelectorContract::default());
    assert!(result.html.starts_with("<h1>Landing</h1>"));
}

#[tokio::test]
async fn captured_html_is_pinned_and_snapshotted() {
    let remote = MockServer::start();
    remote.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(PAGE);
    });

    let client = Client::builder().build();
    let captured = client
        .capture(&remote.url("/"), &SelectorContract::default())
        .await
        .unwrap();

    let mut history = History::new(MemorySnapshotStore::new(), 2);
    let mut pin = PostPin::default();
    for _ in 0..3 {
        save_post_pin(
            &mut pin,
            PinUpdate {
                parent_id: 5,
                parent_title: "Landing".to_string(),
                author_id: 1,
                html: captured.html.clone(),
                is_pinned: true,
                skip_snapshot: false,
                allow_unfiltered_html: true,
            },
            &mut history,
        )
        .unwrap();
    }

    assert_eq!(pin.render("dynamic", true), captured.html);
    let snapshots = history.snapshots(5);
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|s| s.html == captured.html));
}
