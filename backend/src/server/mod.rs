//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
use crate::config::DebugMode;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::analytics::{
    DatasetCatalogue, get_dataset, get_regions, list_datasets, run_query,
};
use crate::inbound::http::error_handling::{self, ErrorHandling, not_found};
use crate::inbound::http::health::{HealthState, health, live, ping, ready};
use crate::inbound::http::ErrorDispatcher;
use crate::logging::LoggerAdapter;

/// Shared state handed to every worker's application.
#[derive(Clone)]
pub struct AppDependencies {
    /// Readiness and liveness flags.
    pub health_state: web::Data<HealthState>,
    /// Datasets served by the analytics endpoints.
    pub catalogue: web::Data<DatasetCatalogue>,
    /// Whether unclassified failures expose tracebacks.
    pub debug: DebugMode,
}

impl AppDependencies {
    /// Dependencies with the built-in catalogue and a not-yet-ready health
    /// state.
    #[must_use]
    pub fn new(debug: DebugMode) -> Self {
        Self {
            health_state: web::Data::new(HealthState::new()),
            catalogue: web::Data::new(DatasetCatalogue::builtin()),
            debug,
        }
    }
}

/// Register the analytics routes under `/api` and the health probes at the
/// root.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(get_regions)
            .service(list_datasets)
            .service(get_dataset)
            .service(run_query),
    )
    .service(health)
    .service(ready)
    .service(live)
    .service(ping);
}

/// Build the application: `Trace` outermost, then failure rendering, then
/// routes. Unmatched paths fall through to a 404 envelope.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        catalogue,
        debug,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(catalogue)
        .configure(error_handling::configure)
        .wrap(ErrorHandling::new(ErrorDispatcher::new(debug.is_enabled())))
        .wrap(Trace)
        .configure(configure_routes);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.default_service(web::to(not_found))
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the listener is bound.
/// - `config`: pre-built [`ServerConfig`] containing the bind address and debug mode.
///
/// # Returns
/// A [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let deps = AppDependencies {
        health_state: health_state.clone(),
        ..AppDependencies::new(config.debug())
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr())?
        .run();

    health_state.mark_ready();
    LoggerAdapter::default()
        .info("Server listening")
        .field("bind_addr", config.bind_addr().to_string())
        .field("debug", config.debug().is_enabled())
        .emit();
    Ok(server)
}
