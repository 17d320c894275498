//! Webhook dispatch against a mock Discord endpoint

use std::time::Duration;

use assert_matches::assert_matches;
use health_monitor::{
    Category,
    alerts::{AlertManager, Delivery},
    config::MonitorConfig,
    discord::DispatchError,
    monitors::host::{HostMonitor, MonitorState},
};
use reqwest::StatusCode;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn manager_for(server: &MockServer) -> AlertManager {
    AlertManager::new(
        Some(format!("{}/api/webhooks/1/token", server.uri())),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_204_is_delivered_with_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = manager_for(&mock_server);
    let delivery = manager.send_alert("🚨 CPU usage: 15.0% (Threshold: 10.0%)").await;
    assert_matches!(delivery, Ok(Delivery::Sent));

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let content = body["content"].as_str().unwrap();

    assert!(content.starts_with("**System Alert - "));
    assert!(content.contains(" UTC**\n🚨 CPU usage: 15.0% (Threshold: 10.0%)"));
    assert_eq!(body.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_200_is_not_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let delivery = manager_for(&mock_server).send_alert("hello").await;
    assert_matches!(
        delivery,
        Err(DispatchError::UnexpectedStatus { status, .. }) if status == StatusCode::OK
    );
}

#[tokio::test]
async fn test_error_status_keeps_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid Webhook Token"))
        .mount(&mock_server)
        .await;

    let err = manager_for(&mock_server)
        .send_alert("hello")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Discord message failed with status: 400 Bad Request (Invalid Webhook Token)"
    );
}

#[tokio::test]
async fn test_missing_webhook_makes_no_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let manager = AlertManager::new(None, Duration::from_secs(2)).unwrap();
    assert!(!manager.is_enabled());
    tokio_test::assert_ok!(manager.send_alert("hello").await);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_slow_webhook_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let manager = AlertManager::new(Some(mock_server.uri()), Duration::from_millis(200)).unwrap();
    let delivery = manager.send_alert("hello").await;
    assert_matches!(delivery, Err(DispatchError::Transport(err)) if err.is_timeout());
}

#[tokio::test]
async fn test_unreachable_webhook_is_transport_error() {
    // nothing listens on port 9 (discard) on the loopback interface
    let manager =
        AlertManager::new(Some("http://127.0.0.1:9/webhook".to_string()), Duration::from_secs(2))
            .unwrap();

    let delivery = manager.send_alert("hello").await;
    assert_matches!(delivery, Err(DispatchError::Transport(_)));
}

#[tokio::test]
async fn test_monitor_continues_after_non_204() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let sampler = FakeSampler::with_values(99.0, 1.0, 1.0);
    let events = FakeEvents::default();
    let mut monitor = HostMonitor::new(
        &MonitorConfig::default(),
        sampler.clone(),
        events.clone(),
        manager_for(&mock_server),
    );

    assert_eq!(monitor.step(at(0)).await, MonitorState::Running);

    sampler.set(Category::Memory, 99.0);
    assert_eq!(monitor.step(at(20)).await, MonitorState::Running);
    assert_eq!(
        monitor.throttle().state().last_fired(Category::Memory),
        Some(at(20))
    );
}
