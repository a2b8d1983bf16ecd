//! Geo-analytics API entry-point: loads settings, installs logging, serves HTTP.

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;

use geo_analytics_api::config::{DebugMode, ServerSettings};
use geo_analytics_api::inbound::http::health::HealthState;
use geo_analytics_api::logging::init_logging;
use geo_analytics_api::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings =
        ServerSettings::load().map_err(|error| std::io::Error::other(error.to_string()))?;
    init_logging(settings.log_level()).map_err(std::io::Error::other)?;

    let debug = DebugMode::from_env(&DefaultEnv::new());
    let config = ServerConfig::from_settings(&settings)
        .map_err(std::io::Error::other)?
        .with_debug(debug);

    let health_state = web::Data::new(HealthState::new());
    create_server(health_state, config)?.await
}
