use serde_json::json;
use std::sync::Arc;

use podpulse::metrics::client::extract_value;
use podpulse::metrics::{ErrorKind, MetricKind, MetricSample, MetricsClient, PrometheusClient, PromQlTemplates};

use crate::common::{closed_endpoint, prometheus_body, serve_http, Responder};

fn targets(target: &str, address: &str) -> bool {
    let instance = format!("{}:9100", address);
    target.contains(&instance) || target.contains(&instance.replace(':', "%3A"))
}

fn client(endpoint: &str) -> PrometheusClient {
    let queries = PromQlTemplates::default()
        .with_template(MetricKind::Cpu, r#"cpu_probe{instance="{instance}"}"#)
        .with_template(MetricKind::Memory, r#"memory_probe{instance="{instance}"}"#);
    PrometheusClient::new(endpoint, Arc::new(queries)).expect("client builds")
}

#[tokio::test]
async fn test_fetch_reads_first_value() {
    let respond: Responder = Arc::new(|target: &str| {
        if target.starts_with("/api/v1/query?query=") && target.contains("cpu_probe") && targets(target, "10.0.0.1") {
            (200, prometheus_body("37.25"))
        } else {
            (404, "{}".to_string())
        }
    });
    let (endpoint, _server) = serve_http(respond).await;
    let client = client(&endpoint);

    assert_eq!(client.endpoint(), endpoint);
    assert_eq!(client.fetch(MetricKind::Cpu, "10.0.0.1").await.unwrap(), 37.25);
    assert_eq!(
        client.query(MetricKind::Cpu, "10.0.0.1").await,
        MetricSample::Value(37.25)
    );
}

#[tokio::test]
async fn test_each_kind_and_address_gets_its_own_query() {
    let respond: Responder = Arc::new(|target: &str| {
        let value = match (target.contains("cpu_probe"), targets(target, "10.0.0.2")) {
            (true, false) => "1",
            (true, true) => "2",
            (false, false) => "3",
            (false, true) => "4",
        };
        (200, prometheus_body(value))
    });
    let (endpoint, _server) = serve_http(respond).await;
    let client = client(&endpoint);

    assert_eq!(client.fetch(MetricKind::Cpu, "10.0.0.1").await.unwrap(), 1.0);
    assert_eq!(client.fetch(MetricKind::Cpu, "10.0.0.2").await.unwrap(), 2.0);
    assert_eq!(client.fetch(MetricKind::Memory, "10.0.0.1").await.unwrap(), 3.0);
    assert_eq!(client.fetch(MetricKind::Memory, "10.0.0.2").await.unwrap(), 4.0);
}

#[tokio::test]
async fn test_http_error_status_is_transport_failure() {
    let respond: Responder = Arc::new(|_: &str| (500, r#"{"status":"error"}"#.to_string()));
    let (endpoint, _server) = serve_http(respond).await;

    let err = client(&endpoint).fetch(MetricKind::Cpu, "10.0.0.1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_non_json_body_is_transport_failure() {
    let respond: Responder = Arc::new(|_: &str| (200, "<html>not prometheus</html>".to_string()));
    let (endpoint, _server) = serve_http(respond).await;

    let err = client(&endpoint).fetch(MetricKind::Memory, "10.0.0.1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_empty_result_is_shape_failure() {
    let respond: Responder = Arc::new(|_: &str| {
        (
            200,
            r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#.to_string(),
        )
    });
    let (endpoint, _server) = serve_http(respond).await;

    let sample = client(&endpoint).query(MetricKind::Cpu, "10.9.9.9").await;

    assert_eq!(sample, MetricSample::Failed(ErrorKind::Shape));
}

#[tokio::test]
async fn test_non_numeric_value_is_shape_failure() {
    let respond: Responder = Arc::new(|_: &str| (200, prometheus_body("not-a-number")));
    let (endpoint, _server) = serve_http(respond).await;

    let err = client(&endpoint).fetch(MetricKind::Cpu, "10.0.0.1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_failure() {
    let endpoint = closed_endpoint().await;

    let sample = client(&endpoint).query(MetricKind::Cpu, "10.0.0.1").await;

    assert_eq!(sample, MetricSample::Failed(ErrorKind::Transport));
}

#[test]
fn test_extract_value_reads_string_sample() {
    let body = json!({
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": [ { "metric": {}, "value": [1717000000.123, "12.5"] } ]
        }
    });

    assert_eq!(extract_value(&body).unwrap(), 12.5);
}

#[test]
fn test_extract_value_shape_failures() {
    for body in [
        json!({}),
        json!({ "data": {} }),
        json!({ "data": { "result": [] } }),
        json!({ "data": { "result": [ {} ] } }),
        json!({ "data": { "result": [ { "value": [1.0] } ] } }),
        json!({ "data": { "result": [ { "value": [1.0, "abc"] } ] } }),
        json!({ "data": { "result": [ { "value": [1.0, null] } ] } }),
    ] {
        assert_eq!(extract_value(&body).unwrap_err().kind(), ErrorKind::Shape, "{}", body);
    }
}

#[test]
fn test_extract_value_rejects_bare_number() {
    // Purpose: sample values must arrive as strings
    let body = json!({ "data": { "result": [ { "value": [1717000000.0, 12.5] } ] } });

    assert_eq!(extract_value(&body).unwrap_err().kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn test_numeric_value_over_http_is_shape_failure() {
    let respond: Responder = Arc::new(|_: &str| {
        (
            200,
            r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1717000000.5,7]}]}}"#.to_string(),
        )
    });
    let (endpoint, _server) = serve_http(respond).await;

    let sample = client(&endpoint).query(MetricKind::Memory, "10.0.0.1").await;

    assert_eq!(sample, MetricSample::Failed(ErrorKind::Shape));
}
