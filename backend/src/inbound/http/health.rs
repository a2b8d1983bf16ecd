//! Health endpoints: health summary, readiness and liveness probes for
//! orchestration and load balancers, plus a connectivity ping.
//! Documented in OpenAPI via Utoipa.
//!
//! There is no `/health/detailed` probe for host statistics; per-check
//! status is reported by `/ready`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use actix_web::{get, web};
use mockable::{Clock, DefaultClock};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Failure, TransportError};
use crate::logging::format_timestamp;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared health state for readiness and liveness checks.
/// Track readiness and whether the process should report itself as alive to orchestrators.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    started: Instant,
    clock: Arc<dyn Clock>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            started: Instant::now(),
            clock: Arc::new(DefaultClock),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clock used to stamp probe responses.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger restarts.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn timestamp(&self) -> String {
        format_timestamp(self.clock.utc())
    }

    fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Basic health summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process answers.
    #[schema(example = "healthy")]
    pub status: String,
    /// UTC time of the probe.
    pub timestamp: String,
    /// Seconds since the process started.
    pub uptime_seconds: f64,
    /// Crate version.
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Result of one readiness check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckStatus {
    /// `ok` or `error`.
    #[schema(example = "ok")]
    pub status: String,
    /// Human-readable explanation.
    pub message: String,
}

/// Readiness summary listing each dependency check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    /// Always `ready` on success.
    #[schema(example = "ready")]
    pub status: String,
    /// Check results keyed by component.
    pub checks: BTreeMap<String, CheckStatus>,
    /// UTC time of the probe.
    pub timestamp: String,
}

/// Liveness summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    /// Always `alive` on success.
    #[schema(example = "alive")]
    pub status: String,
    /// UTC time of the probe.
    pub timestamp: String,
}

/// Reply to `GET /ping`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    /// Always `pong`.
    #[schema(example = "pong")]
    pub message: String,
}

/// Basic health check with uptime and version.
#[utoipa::path(
    get,
    path = "/health",
    tags = ["health"],
    responses((status = 200, description = "Process is healthy", body = HealthResponse))
)]
#[get("/health")]
pub async fn health(state: web::Data<HealthState>) -> web::Json<HealthResponse> {
    web::Json(HealthResponse {
        status: "healthy".to_owned(),
        timestamp: state.timestamp(),
        uptime_seconds: state.uptime_seconds(),
        version: VERSION.to_owned(),
    })
}

/// Readiness probe. Return 200 when the server can handle traffic; a 503
/// error envelope otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready to handle traffic", body = ReadinessResponse),
        (status = 503, description = "Server is not ready", body = crate::inbound::http::schemas::ErrorEnvelopeSchema)
    )
)]
#[get("/ready")]
pub async fn ready(state: web::Data<HealthState>) -> Result<web::Json<ReadinessResponse>, Failure> {
    if !state.is_ready() {
        return Err(TransportError::new(503, "Service not ready").into());
    }
    let checks = BTreeMap::from([(
        "application".to_owned(),
        CheckStatus {
            status: "ok".to_owned(),
            message: "Application is running".to_owned(),
        },
    )]);
    Ok(web::Json(ReadinessResponse {
        status: "ready".to_owned(),
        checks,
        timestamp: state.timestamp(),
    }))
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
/// Call `HealthState::mark_unhealthy` before graceful shutdown to surface the drain early.
#[utoipa::path(
    get,
    path = "/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is alive", body = LivenessResponse),
        (status = 503, description = "Server is shutting down", body = crate::inbound::http::schemas::ErrorEnvelopeSchema)
    )
)]
#[get("/live")]
pub async fn live(state: web::Data<HealthState>) -> Result<web::Json<LivenessResponse>, Failure> {
    if !state.is_alive() {
        return Err(TransportError::new(503, "Service shutting down").into());
    }
    Ok(web::Json(LivenessResponse {
        status: "alive".to_owned(),
        timestamp: state.timestamp(),
    }))
}

/// Connectivity check.
#[utoipa::path(
    get,
    path = "/ping",
    tags = ["health"],
    responses((status = 200, description = "Pong", body = PingResponse))
)]
#[get("/ping")]
pub async fn ping() -> web::Json<PingResponse> {
    web::Json(PingResponse {
        message: "pong".to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::dispatch::ErrorDispatcher;
    use crate::inbound::http::error_handling::ErrorHandling;
    use crate::inbound::http::error_response::ErrorEnvelope;
    use crate::logging::capture::{CapturedLogs, FixedClock};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;

    async fn get(state: web::Data<HealthState>, uri: &str) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(state)
                .wrap(ErrorHandling::new(ErrorDispatcher::new(false)))
                .service(health)
                .service(ready)
                .service(live)
                .service(ping),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri(uri).to_request())
            .await
            .map_into_boxed_body()
    }

    fn state() -> web::Data<HealthState> {
        web::Data::new(
            HealthState::new().with_clock(Arc::new(FixedClock(CapturedLogs::fixed_instant()))),
        )
    }

    #[actix_web::test]
    async fn health_reports_version_and_uptime() {
        let res = get(state(), "/health").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: HealthResponse = test::read_body_json(res).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.version, VERSION);
        assert_eq!(body.timestamp, "2026-03-04T05:06:07.000000Z");
        assert!(body.uptime_seconds >= 0.0);
    }

    #[actix_web::test]
    async fn ready_fails_until_marked() {
        let state = state();
        let res = get(state.clone(), "/ready").await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: ErrorEnvelope = test::read_body_json(res).await;
        assert_eq!(body.error.error_code, "HTTP_ERROR");
        assert_eq!(body.error.message, "Service not ready");

        state.mark_ready();
        let res = get(state, "/ready").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: ReadinessResponse = test::read_body_json(res).await;
        assert_eq!(body.status, "ready");
        assert_eq!(body.checks["application"].status, "ok");
        assert_eq!(body.checks["application"].message, "Application is running");
    }

    #[actix_web::test]
    async fn live_reports_draining() {
        let state = state();
        let res = get(state.clone(), "/live").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: LivenessResponse = test::read_body_json(res).await;
        assert_eq!(body.status, "alive");

        state.mark_unhealthy();
        let res = get(state, "/live").await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[rstest]
    #[actix_web::test]
    async fn ping_pongs() {
        let res = get(state(), "/ping").await;
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body, serde_json::json!({"message": "pong"}));
    }
}
