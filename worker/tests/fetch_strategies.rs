//! Fetch interception end to end: classification, both strategies and the
//! offline fallbacks.

mod common;

use futures::executor::block_on;

use common::Harness;
use flatscout_worker::events::FetchEvent;
use flatscout_worker::{NetworkError, Outcome, Request, RequestMethod, Response, WorkerEvent};

fn fetch(harness: &Harness, request: Request) -> Outcome {
    let dispatched = block_on(
        harness
            .worker
            .dispatch(WorkerEvent::Fetch(FetchEvent::new(request))),
    )
    .unwrap();
    block_on(dispatched.lifetime.settle());
    dispatched.outcome
}

fn response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Responded(response) => response,
        other => panic!("expected a response, got {:?}", other),
    }
}

#[test]
fn api_request_is_served_live_and_stored_in_dynamic_cache() {
    let h = Harness::new();
    let url = h.url("/api/flats?city=leeds");
    h.network.ok(&url, r#"[{"id":"abc"}]"#);

    let resp = response(fetch(&h, Request::new(url.clone())));
    assert_eq!(resp.body, br#"[{"id":"abc"}]"#);

    let dynamic = h.worker.config().dynamic_cache();
    let cached = h.worker.caches().match_in(&dynamic, &Request::new(url)).unwrap();
    assert_eq!(cached.body, br#"[{"id":"abc"}]"#);
}

#[test]
fn api_refetch_overwrites_cached_entry() {
    let h = Harness::new();
    let url = h.url("/api/flatmates");
    h.network.once(&url, Ok(Response::new(200).with_body(b"v1".to_vec())));
    h.network.once(&url, Ok(Response::new(200).with_body(b"v2".to_vec())));

    fetch(&h, Request::new(url.clone()));
    fetch(&h, Request::new(url.clone()));

    let dynamic = h.worker.config().dynamic_cache();
    assert_eq!(h.worker.caches().entry_count(&dynamic), Some(1));
    assert_eq!(
        h.worker.caches().match_request(&Request::new(url)).unwrap().body,
        b"v2"
    );
}

#[test]
fn cached_static_asset_makes_no_network_call() {
    let h = Harness::new();
    let url = h.url("/static/js/bundle.js");
    let stored = Response::new(200).with_body(b"console.log(1)".to_vec());
    h.worker.caches().put(
        &h.worker.config().static_cache(),
        Request::new(url.clone()),
        stored.clone(),
    );
    h.network.ok(&url, "fresh bundle");

    let resp = response(fetch(&h, Request::new(url)));
    assert_eq!(resp, stored);
    assert_eq!(h.network.call_count(), 0);
}

#[test]
fn offline_request_returns_entry_cached_by_network_first() {
    let h = Harness::new();
    let url = h.url("/api/wishlist");
    h.network.once(&url, Ok(Response::new(200).with_body(b"saved".to_vec())));
    fetch(&h, Request::new(url.clone()));

    // The script is exhausted, so the network is now offline.
    let resp = response(fetch(&h, Request::new(url)));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"saved");
}

#[test]
fn offline_request_returns_entry_cached_by_cache_first() {
    let h = Harness::new();
    let url = "https://fonts.example.com/inter.woff2".to_string();
    h.network.once(&url, Ok(Response::new(200).with_body(b"font".to_vec())));
    fetch(&h, Request::new(url.clone()));

    let resp = response(fetch(&h, Request::new(url)));
    assert_eq!(resp.body, b"font");
    assert_eq!(h.network.call_count(), 1);
}

#[test]
fn offline_without_cache_non_navigation_is_503() {
    let h = Harness::new();
    let resp = response(fetch(&h, Request::new(h.url("/api/flats/17"))));
    assert_eq!(resp.status, 503);
    assert_eq!(resp.text(), Some("Network error"));

    let resp = response(fetch(&h, Request::new(h.url("/images/banner.jpg"))));
    assert_eq!(resp.status, 503);
    assert_eq!(resp.text(), Some("Resource not available"));
}

#[test]
fn offline_navigation_serves_cached_root() {
    let h = Harness::new();
    h.worker.caches().put(
        &h.worker.config().static_cache(),
        Request::new(h.url("/")),
        Response::new(200).with_body(b"<div id=root>".to_vec()),
    );

    let resp = response(fetch(&h, Request::navigate(h.url("/find-flatmates"))));
    assert_eq!(resp.body, b"<div id=root>");
}

#[test]
fn offline_navigation_without_root_is_offline_503() {
    let h = Harness::new();
    let resp = response(fetch(&h, Request::navigate(h.url("/profile"))));
    assert_eq!(resp.status, 503);
    assert_eq!(resp.text(), Some("Offline"));
}

#[test]
fn failed_fetch_variants_all_fall_back() {
    let h = Harness::new();
    let url = h.url("/api/flats");
    for error in [
        NetworkError::Offline,
        NetworkError::Timeout,
        NetworkError::Dns {
            host: "localhost".into(),
        },
    ] {
        h.network.once(&url, Err(error));
        let resp = response(fetch(&h, Request::new(url.clone())));
        assert_eq!(resp.status, 503);
    }
}

#[test]
fn http_error_is_returned_but_not_cached() {
    let h = Harness::new();
    let url = h.url("/api/flats");
    h.network.always(&url, Ok(Response::new(500)));

    let resp = response(fetch(&h, Request::new(url.clone())));
    assert_eq!(resp.status, 500);
    assert!(h.worker.caches().match_request(&Request::new(url)).is_none());
}

#[test]
fn post_requests_pass_through() {
    let h = Harness::new();
    let request = Request::new(h.url("/api/wishlist/add"))
        .with_method(RequestMethod::Post)
        .with_body(br#"{"flatId":"abc"}"#.to_vec());
    assert_eq!(fetch(&h, request), Outcome::Passthrough);
    assert_eq!(h.network.call_count(), 0);
}

#[test]
fn extension_requests_pass_through() {
    let h = Harness::new();
    assert_eq!(
        fetch(&h, Request::new("chrome-extension://abcdef/content.js")),
        Outcome::Passthrough
    );
}

#[test]
fn cache_write_waits_for_lifetime() {
    let h = Harness::new();
    let url = h.url("/api/flats");
    h.network.ok(&url, "[]");

    let dispatched = block_on(
        h.worker
            .dispatch(WorkerEvent::Fetch(FetchEvent::new(Request::new(url.clone())))),
    )
    .unwrap();
    assert_eq!(dispatched.lifetime.pending(), 1);
    assert!(h.worker.caches().match_request(&Request::new(url.clone())).is_none());

    block_on(dispatched.lifetime.settle());
    assert!(h.worker.caches().match_request(&Request::new(url)).is_some());
}
