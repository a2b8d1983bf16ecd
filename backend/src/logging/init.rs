//! Process-wide logging installation.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::JsonRecordLayer;

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingInitError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter directive '{directive}': {source}")]
    InvalidDirective {
        /// Directive that failed to parse.
        directive: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
    /// A global subscriber is already installed.
    #[error("logging already initialised: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Build the event filter: a non-empty `RUST_LOG` wins over `level`.
///
/// # Examples
/// ```
/// use geo_analytics_api::logging::build_filter;
///
/// let filter = build_filter(None, "debug").expect("valid level");
/// assert_eq!(filter.to_string().to_ascii_lowercase(), "debug");
/// ```
pub fn build_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter, LoggingInitError> {
    let directive = rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|source| LoggingInitError::InvalidDirective {
        directive: directive.to_owned(),
        source,
    })
}

/// Install the JSON record layer on stdout as the global subscriber.
///
/// Calling this twice returns [`LoggingInitError::AlreadyInstalled`].
pub fn init_logging(level: &str) -> Result<(), LoggingInitError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(JsonRecordLayer::new(std::io::stdout))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "info", "info")]
    #[case(Some(""), "warn", "warn")]
    #[case(Some("  "), "warn", "warn")]
    #[case(Some("geo_analytics_api=debug"), "info", "geo_analytics_api=debug")]
    fn rust_log_wins_when_present(
        #[case] rust_log: Option<&str>,
        #[case] level: &str,
        #[case] expected: &str,
    ) {
        let filter = build_filter(rust_log, level).expect("valid directive");
        assert_eq!(filter.to_string().to_ascii_lowercase(), expected);
    }

    #[rstest]
    fn invalid_directives_are_reported() {
        let error = build_filter(None, "geo=notalevel").expect_err("invalid directive");
        assert!(matches!(
            error,
            LoggingInitError::InvalidDirective { ref directive, .. } if directive == "geo=notalevel"
        ));
    }
}
