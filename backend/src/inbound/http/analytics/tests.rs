//! Tests for the analytics endpoints.

use super::*;
use crate::domain::DomainErrorKind;
use crate::inbound::http::dispatch::ErrorDispatcher;
use crate::inbound::http::error_handling::{self, ErrorHandling};
use crate::inbound::http::error_response::ErrorEnvelope;
use crate::logging::capture::CapturedLogs;
use actix_web::http::StatusCode;
use actix_web::App;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn catalogue() -> DatasetCatalogue {
    DatasetCatalogue::builtin()
}

async fn post_query(body: serde_json::Value) -> actix_web::dev::ServiceResponse {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(DatasetCatalogue::builtin()))
            .configure(error_handling::configure)
            .wrap(ErrorHandling::new(ErrorDispatcher::new(false)))
            .service(
                web::scope("/api")
                    .service(get_regions)
                    .service(get_dataset)
                    .service(run_query),
            ),
    )
    .await;
    let req = actix_test::TestRequest::post()
        .uri("/api/analytics/query")
        .set_json(body)
        .to_request();
    actix_test::call_service(&app, req).await.map_into_boxed_body()
}

#[rstest]
fn regions_hold_the_two_seeded_observations(catalogue: DatasetCatalogue) {
    let regions = catalogue.regions();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].region, "North America");
    assert_eq!(regions[0].value, 1_200_000);
    assert_eq!(regions[1].region, "Europe");
    assert_eq!(regions[1].value, 850_000);
}

#[rstest]
fn unknown_dataset_is_a_domain_error(catalogue: DatasetCatalogue) {
    let error = catalogue.summary("abc123").expect_err("unknown id");
    assert_eq!(
        error.kind(),
        &DomainErrorKind::DatasetNotFound {
            dataset_id: "abc123".to_owned()
        }
    );
}

#[rstest]
fn unsupported_metric_is_invalid_data(catalogue: DatasetCatalogue) {
    let error = catalogue
        .query("regional-revenue", "footfall", 10)
        .expect_err("metric missing");
    assert_eq!(error.status_code(), 400);
    assert_eq!(error.details()["metric"], "footfall");
    assert_eq!(error.details()["supported_metrics"], json!(["revenue"]));
}

#[rstest]
fn query_sums_up_to_the_limit(catalogue: DatasetCatalogue) {
    let all = catalogue.query("regional-revenue", "revenue", 10).expect("query");
    assert_eq!(all.count, 2);
    assert_eq!(all.total, 2_050_000);

    let one = catalogue.query("regional-revenue", "revenue", 1).expect("query");
    assert_eq!(one.count, 1);
    assert_eq!(one.total, 1_200_000);
}

#[rstest]
fn overflowing_totals_fail_processing() {
    let records = vec![
        RegionMetric::new("A", "visits", u64::MAX, 0.0, 0.0),
        RegionMetric::new("B", "visits", 1, 0.0, 0.0),
    ];
    let catalogue = DatasetCatalogue::builtin().with_dataset("huge", &["visits"], records);
    let error = catalogue.query("huge", "visits", 10).expect_err("overflow");
    assert_eq!(error.error_code(), "ANALYTICS_PROCESSING_ERROR");
    assert_eq!(error.details()["operation"], "sum");
}

#[actix_web::test]
async fn query_endpoint_returns_the_aggregate() {
    let res = post_query(json!({"dataset_id": "regional-revenue", "metric": "revenue"})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: QueryResult = actix_test::read_body_json(res).await;
    assert_eq!(body.total, 2_050_000);
    assert_eq!(body.rows.len(), 2);
}

#[rstest]
#[case::zero(0)]
#[case::negative(-5)]
#[case::too_many(1001)]
#[actix_web::test]
async fn out_of_range_limits_are_validation_failures(#[case] limit: i64) {
    let res = post_query(json!({
        "dataset_id": "regional-revenue",
        "metric": "revenue",
        "limit": limit,
    }))
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorEnvelope = actix_test::read_body_json(res).await;
    assert_eq!(body.error.error_code, "VALIDATION_ERROR");
    assert_eq!(
        body.error.details["validation_errors"][0]["loc"],
        json!(["body", "limit"])
    );
}

#[actix_web::test]
async fn unknown_dataset_in_query_is_not_found() {
    let res = post_query(json!({"dataset_id": "abc123", "metric": "revenue"})).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: ErrorEnvelope = actix_test::read_body_json(res).await;
    assert_eq!(body.error.error_code, "DATASET_NOT_FOUND");
}

#[actix_web::test]
async fn queries_are_timed() {
    let logs = CapturedLogs::new();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let res = post_query(json!({"dataset_id": "regional-revenue", "metric": "revenue"})).await;
    assert_eq!(res.status(), StatusCode::OK);

    let records = logs.records();
    let messages: Vec<&str> = records
        .iter()
        .filter_map(|record| record["message"].as_str())
        .collect();
    assert_eq!(
        messages,
        ["Starting: analytics_query", "Completed: analytics_query"]
    );
    let completed = &records[1];
    assert_eq!(completed["logger"], LOGGER_NAME);
    assert_eq!(completed["dataset_id"], "regional-revenue");
    assert_eq!(completed["success"], true);
}
