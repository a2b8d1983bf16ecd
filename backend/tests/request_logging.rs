//! Behavioural tests for request-correlated logging through the application.

use actix_web::http::StatusCode;
use actix_web::test;
use geo_analytics_api::config::DebugMode;
use geo_analytics_api::logging::capture::CapturedLogs;
use geo_analytics_api::server::{AppDependencies, build_app};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn logs() -> CapturedLogs {
    CapturedLogs::new()
}

async fn call(request: test::TestRequest) -> (StatusCode, String) {
    let app = test::init_service(build_app(AppDependencies::new(DebugMode::Disabled))).await;
    let res = test::call_service(&app, request.to_request()).await;
    let trace_id = res
        .headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .expect("trace-id header")
        .to_owned();
    (res.status(), trace_id)
}

fn find<'a>(records: &'a [Value], message: &str) -> &'a Value {
    records
        .iter()
        .find(|record| record["message"] == message)
        .unwrap_or_else(|| panic!("no record with message {message:?} in {records:?}"))
}

#[rstest]
#[actix_web::test]
async fn domain_failures_are_logged_with_the_request_id(logs: CapturedLogs) {
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let (status, trace_id) = call(test::TestRequest::get().uri("/api/datasets/abc123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let records = logs.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["level"], "ERROR");
    assert_eq!(record["request_id"], json!(trace_id));
    assert_eq!(record["error_code"], "DATASET_NOT_FOUND");
    assert_eq!(record["method"], "GET");
    assert!(
        record["path"]
            .as_str()
            .is_some_and(|path| path.ends_with("/api/datasets/abc123"))
    );
    assert_eq!(record["exception"]["type"], "DatasetNotFound");
}

#[rstest]
#[actix_web::test]
async fn timed_queries_share_the_request_id(logs: CapturedLogs) {
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let (status, trace_id) = call(
        test::TestRequest::post()
            .uri("/api/analytics/query")
            .set_json(json!({"dataset_id": "regional-revenue", "metric": "revenue", "limit": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let records = logs.records();
    let started = find(&records, "Starting: analytics_query");
    let completed = find(&records, "Completed: analytics_query");
    assert_eq!(started["request_id"], json!(trace_id));
    assert_eq!(completed["request_id"], json!(trace_id));
    assert_eq!(completed["limit"], 1);
    assert!(completed["duration_ms"].as_f64().is_some_and(|ms| ms >= 0.0));
}

#[rstest]
#[actix_web::test]
async fn validation_and_transport_failures_are_not_logged(logs: CapturedLogs) {
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let (status, _) = call(test::TestRequest::get().uri("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        test::TestRequest::post()
            .uri("/api/analytics/query")
            .set_json(json!({"metric": "revenue"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(logs.records().is_empty());
}

#[rstest]
#[actix_web::test]
async fn every_line_is_a_json_object(logs: CapturedLogs) {
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    call(test::TestRequest::get().uri("/api/datasets/abc123")).await;
    call(
        test::TestRequest::post()
            .uri("/api/analytics/query")
            .set_json(json!({"dataset_id": "regional-revenue", "metric": "revenue"})),
    )
    .await;

    let lines = logs.lines();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let record: Value = serde_json::from_str(&line).expect("line parses as JSON");
        for key in ["timestamp", "level", "logger", "message"] {
            assert!(record.get(key).is_some(), "missing {key} in {line}");
        }
    }
}
