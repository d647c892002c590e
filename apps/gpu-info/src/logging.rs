use std::env;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable holding a full filter directive, e.g. `pbs_inventory=debug`
pub const LOG_ENV: &str = "GPU_INFO_LOG";

/// Install the global subscriber. Events go to stderr so stdout stays parseable.
pub fn init(config: &LoggingConfig, verbose: u8) {
    let filter = build_filter(env::var(LOG_ENV).ok().as_deref(), &config.level, verbose);
    let registry = Registry::default().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn build_filter(env_directive: Option<&str>, level: &str, verbose: u8) -> EnvFilter {
    if let Some(directive) = env_directive.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::new(directive);
    }
    EnvFilter::new(verbosity_directive(level, verbose))
}

fn verbosity_directive(level: &str, verbose: u8) -> &str {
    match verbose {
        0 => level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
