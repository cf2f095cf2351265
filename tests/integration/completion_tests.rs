//! Non-streaming completion path, end to end through the HTTP surface

use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::Value;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modelrelay::MemoryUsageSink;
use modelrelay::server::routes;

use crate::common;

#[actix_web::test]
async fn test_completion_round_trip_is_verbatim_with_one_usage_event() {
    let upstream = MockServer::start().await;
    let reply = common::completion_body("m1", "hello there", 3, 2);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
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
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The body must come back untouched, vendor extras included
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, reply);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].model, "m1");
    assert_eq!(events[0].provider, "acme");
    assert_eq!(events[0].tokens_in, 3);
    assert_eq!(events[0].tokens_out, 2);
}

#[actix_web::test]
async fn test_upstream_500_maps_to_503_with_failure_event() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"message": "upstream exploded"}
        })))
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
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PROVIDER_ERROR");
    assert_eq!(body["error"]["provider"], "acme");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("upstream exploded")
    );

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(events[0].tokens_in, 0);
}

#[actix_web::test]
async fn test_upstream_429_maps_to_429() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
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
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "RATE_LIMIT");
    assert_eq!(sink.event_count(), 1);
}

#[actix_web::test]
async fn test_upstream_401_maps_to_500_not_401() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
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
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Upstream credential state must not leak to callers as a 401
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PROVIDER_AUTH_ERROR");
    assert_eq!(sink.event_count(), 1);
}

#[actix_web::test]
async fn test_provider_trips_threshold_and_is_refused_without_contact() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&upstream)
        .await;

    let sink = Arc::new(MemoryUsageSink::new());
    let app = test::init_service(
        App::new()
            .app_data(common::relay_state(
                common::upstream_config(&upstream, &["m1"], 30, 2),
                sink.clone(),
            ))
            .configure(routes::configure),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/v1/chat/completions")
            .set_json(common::chat_payload("m1", false))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "PROVIDER_ERROR");
    }

    // Third request is refused at lookup; the upstream sees nothing and no
    // usage event is recorded
    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PROVIDER_UNHEALTHY");
    assert_eq!(sink.event_count(), 2);

    // Aggregate health reflects the tripped provider
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["healthy_providers"], 0);
}

#[actix_web::test]
async fn test_total_only_usage_counts_zero_split_tokens() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-total-only",
            "object": "chat.completion",
            "model": "m1",
            "choices": [],
            "usage": {"total_tokens": 7}
        })))
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
        .set_json(common::chat_payload("m1", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // No prompt/completion breakdown means the split counters stay zero
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].tokens_in, 0);
    assert_eq!(events[0].tokens_out, 0);
}
