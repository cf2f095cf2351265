//! Streaming completion path: SSE relay fidelity, termination, accounting

use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modelrelay::MemoryUsageSink;
use modelrelay::server::routes;

use crate::common;

const UPSTREAM_SSE: &str = concat!(
    "data: {\"id\":\"chatcmpl-s1\",\"object\":\"chat.completion.chunk\",\"model\":\"m1\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hel\"}}]}\n\n",
    "data: {\"id\":\"chatcmpl-s1\",\"object\":\"chat.completion.chunk\",\"model\":\"m1\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}],",
    "\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}\n\n",
);

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[actix_web::test]
async fn test_stream_relays_verbatim_and_appends_done() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(UPSTREAM_SSE, "text/event-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let app = test::init_service(
        App::new()
            .app_data(common::relay_state(
                common::upstream_config(&upstream, &["m1"], 30, 5),
                sink.clone(),
            ))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(common::chat_payload("m1", true))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();

    // Upstream bytes pass through untouched; the terminator is appended
    // because the upstream never sent one
    assert_eq!(text, format!("{UPSTREAM_SSE}data: [DONE]\n\n"));
    assert_eq!(count_occurrences(text, "[DONE]"), 1);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].provider, "acme");
    assert_eq!(events[0].tokens_in, 3);
    assert_eq!(events[0].tokens_out, 2);
}

#[actix_web::test]
async fn test_stream_does_not_duplicate_upstream_done() {
    let upstream = MockServer::start().await;
    let sse = format!("{UPSTREAM_SSE}data: [DONE]\n\n");
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&upstream)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let app = test::init_service(
        App::new()
            .app_data(common::relay_state(
                common::upstream_config(&upstream, &["m1"], 30, 5),
                sink.clone(),
            ))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(common::chat_payload("m1", true))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert_eq!(count_occurrences(text, "[DONE]"), 1);
    assert_eq!(sink.event_count(), 1);
}

#[actix_web::test]
async fn test_stream_open_failure_is_json_error_with_failure_event() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let app = test::init_service(
        App::new()
            .app_data(common::relay_state(
                common::upstream_config(&upstream, &["m1"], 30, 5),
                sink.clone(),
            ))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(common::chat_payload("m1", true))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Nothing was relayed yet, so the caller gets a plain JSON error
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PROVIDER_ERROR");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
}

#[actix_web::test]
async fn test_stream_open_respects_session_deadline() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(UPSTREAM_SSE, "text/event-stream")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&upstream)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let app = test::init_service(
        App::new()
            .app_data(common::relay_state(
                common::upstream_config(&upstream, &["m1"], 1, 5),
                sink.clone(),
            ))
            .configure(routes::configure),
    )
    .await;

    let started = Instant::now();
    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(common::chat_payload("m1", true))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(started.elapsed() < Duration::from_millis(2500));

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PROVIDER_TIMEOUT");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert!(events[0].error.as_deref().unwrap().contains("deadline"));
}
