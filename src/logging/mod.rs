//! `tracing` subscriber setup for the API server

use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::get_environment;

/// Directive used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_DIRECTIVE: &str = "info,hyper=warn,reqwest=warn,tokio_postgres=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shipping
    Json,
    /// Coloured multi-field lines for a terminal
    Pretty,
}

impl LogFormat {
    pub fn for_environment(environment: &str) -> Self {
        match environment.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// `RUST_LOG` if it parses, otherwise [`DEFAULT_DIRECTIVE`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Build a filter from an explicit directive string.
pub fn parse_filter(directives: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(directives)
}

fn output_layer(format: LogFormat, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stdout);

    match format {
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
        LogFormat::Pretty => layer.with_ansi(true).with_filter(filter).boxed(),
    }
}

/// Install the global subscriber with the format picked from `ENVIRONMENT`.
///
/// A subscriber installed earlier is left in place.
pub fn init_logging() {
    let format = LogFormat::for_environment(&get_environment());
    if let Err(e) = tracing_subscriber::registry()
        .with(output_layer(format, env_filter()))
        .try_init()
    {
        eprintln!("logging already initialised: {}", e);
    }
}
