//! Analytics endpoints.
//!
//! ```text
//! GET  /api/regions
//! GET  /api/datasets
//! GET  /api/datasets/{dataset_id}
//! POST /api/analytics/query
//! ```
//!
//! Data is served from an in-memory [`DatasetCatalogue`] registered as app
//! data. Failures are returned as [`Failure`] values and rendered by the
//! error-handling middleware.

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use utoipa::ToSchema;

use crate::domain::{DomainError, Failure, ValidationErrors, ValidationIssue};
use crate::logging::{LoggerAdapter, PerformanceScope};

/// Smallest accepted `limit`.
pub const MIN_LIMIT: i64 = 1;
/// Largest accepted `limit`.
pub const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;
const LOGGER_NAME: &str = "geo-analytics-api.analytics";

/// One geo-tagged metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegionMetric {
    /// Region label.
    #[schema(example = "North America")]
    pub region: String,
    /// Metric name.
    #[schema(example = "revenue")]
    pub metric: String,
    /// Observed value.
    #[schema(example = 1_200_000)]
    pub value: u64,
    /// Latitude of the region centroid.
    pub lat: f64,
    /// Longitude of the region centroid.
    pub lon: f64,
}

impl RegionMetric {
    fn new(region: &str, metric: &str, value: u64, lat: f64, lon: f64) -> Self {
        Self {
            region: region.to_owned(),
            metric: metric.to_owned(),
            value,
            lat,
            lon,
        }
    }
}

/// Public description of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatasetSummary {
    /// Stable dataset identifier.
    #[schema(example = "regional-revenue")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Metrics that can be queried.
    pub metrics: Vec<String>,
    /// Number of stored observations.
    pub record_count: usize,
}

#[derive(Debug, Clone)]
struct Dataset {
    id: String,
    name: String,
    metrics: Vec<String>,
    records: Vec<RegionMetric>,
}

impl Dataset {
    fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            metrics: self.metrics.clone(),
            record_count: self.records.len(),
        }
    }
}

/// In-memory store of queryable datasets.
#[derive(Debug, Clone)]
pub struct DatasetCatalogue {
    regions: Vec<RegionMetric>,
    datasets: Vec<Dataset>,
}

impl Default for DatasetCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DatasetCatalogue {
    /// Catalogue shipped with the service.
    #[must_use]
    pub fn builtin() -> Self {
        let regions = vec![
            RegionMetric::new("North America", "revenue", 1_200_000, 37.09, -95.71),
            RegionMetric::new("Europe", "revenue", 850_000, 54.52, 15.25),
        ];
        let datasets = vec![Dataset {
            id: "regional-revenue".to_owned(),
            name: "Regional revenue".to_owned(),
            metrics: vec!["revenue".to_owned()],
            records: regions.clone(),
        }];
        Self { regions, datasets }
    }

    /// Replace the observations of `dataset_id`, creating it if missing.
    #[must_use]
    pub fn with_dataset(
        mut self,
        dataset_id: &str,
        metrics: &[&str],
        records: Vec<RegionMetric>,
    ) -> Self {
        self.datasets.retain(|dataset| dataset.id != dataset_id);
        self.datasets.push(Dataset {
            id: dataset_id.to_owned(),
            name: dataset_id.to_owned(),
            metrics: metrics.iter().map(|&metric| metric.to_owned()).collect(),
            records,
        });
        self
    }

    /// Every regional observation.
    #[must_use]
    pub fn regions(&self) -> &[RegionMetric] {
        &self.regions
    }

    /// Summaries of every dataset.
    #[must_use]
    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.datasets.iter().map(Dataset::summary).collect()
    }

    fn find(&self, dataset_id: &str) -> Result<&Dataset, DomainError> {
        self.datasets
            .iter()
            .find(|dataset| dataset.id == dataset_id)
            .ok_or_else(|| DomainError::dataset_not_found(dataset_id))
    }

    /// Look up one dataset summary.
    ///
    /// # Errors
    /// Returns [`DomainError`] (`DATASET_NOT_FOUND`) for unknown ids.
    pub fn summary(&self, dataset_id: &str) -> Result<DatasetSummary, DomainError> {
        self.find(dataset_id).map(Dataset::summary)
    }

    /// Aggregate `metric` over at most `limit` observations of a dataset.
    ///
    /// # Errors
    /// Unknown datasets yield `DATASET_NOT_FOUND`, unsupported metrics
    /// `INVALID_DATA_FORMAT`, and a total that does not fit in `u64`
    /// `ANALYTICS_PROCESSING_ERROR`.
    pub fn query(
        &self,
        dataset_id: &str,
        metric: &str,
        limit: usize,
    ) -> Result<QueryResult, DomainError> {
        let dataset = self.find(dataset_id)?;
        if !dataset.metrics.iter().any(|known| known == metric) {
            return Err(DomainError::invalid_data_format(format!(
                "metric '{metric}' is not available for dataset '{dataset_id}'"
            ))
            .with_detail("metric", metric)
            .with_detail("supported_metrics", dataset.metrics.clone()));
        }

        let rows: Vec<RegionMetric> = dataset
            .records
            .iter()
            .filter(|record| record.metric == metric)
            .take(limit)
            .cloned()
            .collect();
        let total = rows
            .iter()
            .try_fold(0_u64, |sum, row| sum.checked_add(row.value))
            .ok_or_else(|| {
                DomainError::analytics_processing("sum", format!("total of '{metric}' overflowed"))
            })?;

        Ok(QueryResult {
            dataset_id: dataset.id.clone(),
            metric: metric.to_owned(),
            count: rows.len(),
            total,
            rows,
        })
    }
}

/// Body of `POST /api/analytics/query`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AnalyticsQuery {
    /// Dataset to aggregate.
    #[schema(example = "regional-revenue")]
    pub dataset_id: String,
    /// Metric to sum.
    #[schema(example = "revenue")]
    pub metric: String,
    /// Maximum number of observations to include (1 to 1000).
    #[serde(default = "default_limit")]
    #[schema(example = 100, minimum = 1, maximum = 1000)]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl AnalyticsQuery {
    fn validated_limit(&self) -> Result<usize, ValidationErrors> {
        (MIN_LIMIT..=MAX_LIMIT)
            .contains(&self.limit)
            .then(|| usize::try_from(self.limit).ok())
            .flatten()
            .ok_or_else(|| {
                ValidationErrors::single(ValidationIssue::new(
                    ["body", "limit"],
                    format!("Input should be between {MIN_LIMIT} and {MAX_LIMIT}"),
                    "value_error",
                ))
            })
    }
}

/// Aggregated answer to an [`AnalyticsQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Dataset that was aggregated.
    pub dataset_id: String,
    /// Metric that was summed.
    pub metric: String,
    /// Number of observations included.
    pub count: usize,
    /// Sum of the included values.
    pub total: u64,
    /// Included observations.
    pub rows: Vec<RegionMetric>,
}

/// List regional metric observations.
#[utoipa::path(
    get,
    path = "/api/regions",
    tags = ["analytics"],
    responses((status = 200, description = "Regional observations", body = Vec<RegionMetric>))
)]
#[get("/regions")]
pub async fn get_regions(catalogue: web::Data<DatasetCatalogue>) -> web::Json<Vec<RegionMetric>> {
    web::Json(catalogue.regions().to_vec())
}

/// List available datasets.
#[utoipa::path(
    get,
    path = "/api/datasets",
    tags = ["analytics"],
    responses((status = 200, description = "Dataset summaries", body = Vec<DatasetSummary>))
)]
#[get("/datasets")]
pub async fn list_datasets(
    catalogue: web::Data<DatasetCatalogue>,
) -> web::Json<Vec<DatasetSummary>> {
    web::Json(catalogue.summaries())
}

/// Describe one dataset.
#[utoipa::path(
    get,
    path = "/api/datasets/{dataset_id}",
    tags = ["analytics"],
    params(("dataset_id" = String, Path, description = "Dataset identifier")),
    responses(
        (status = 200, description = "Dataset summary", body = DatasetSummary),
        (status = 404, description = "Unknown dataset", body = crate::inbound::http::schemas::ErrorEnvelopeSchema)
    )
)]
#[get("/datasets/{dataset_id}")]
pub async fn get_dataset(
    catalogue: web::Data<DatasetCatalogue>,
    path: web::Path<String>,
) -> Result<web::Json<DatasetSummary>, Failure> {
    let dataset_id = path.into_inner();
    Ok(web::Json(catalogue.summary(&dataset_id)?))
}

/// Aggregate a metric over a dataset.
#[utoipa::path(
    post,
    path = "/api/analytics/query",
    tags = ["analytics"],
    request_body = AnalyticsQuery,
    responses(
        (status = 200, description = "Aggregated result", body = QueryResult),
        (status = 400, description = "Unsupported metric", body = crate::inbound::http::schemas::ErrorEnvelopeSchema),
        (status = 404, description = "Unknown dataset", body = crate::inbound::http::schemas::ErrorEnvelopeSchema),
        (status = 422, description = "Request validation failed", body = crate::inbound::http::schemas::ErrorEnvelopeSchema)
    )
)]
#[post("/analytics/query")]
pub async fn run_query(
    catalogue: web::Data<DatasetCatalogue>,
    payload: web::Json<AnalyticsQuery>,
) -> Result<web::Json<QueryResult>, Failure> {
    let query = payload.into_inner();
    let limit = query.validated_limit()?;

    let logger = LoggerAdapter::get_logger(LOGGER_NAME);
    let mut context = Map::new();
    context.insert("dataset_id".to_owned(), query.dataset_id.clone().into());
    context.insert("metric".to_owned(), query.metric.clone().into());
    context.insert("limit".to_owned(), limit.into());

    let result = PerformanceScope::run_async(&logger, "analytics_query", context, async {
        catalogue.query(&query.dataset_id, &query.metric, limit)
    })
    .await?;
    Ok(web::Json(result))
}

#[cfg(test)]
mod tests;
