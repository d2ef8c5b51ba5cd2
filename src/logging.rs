//! Tracing subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `verbose`. Lines are JSON objects when `json` is set
/// or `MIXTAPE_LOG_FORMAT=json`, human-readable otherwise.
pub fn init(verbose: bool, json: bool) {
    let use_json = json || json_from_env(std::env::var("MIXTAPE_LOG_FORMAT").ok().as_deref());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if use_json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()
    };
    // A subscriber installed earlier (e.g. by a test harness) is kept.
    let _ = result;
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "mixtape=debug" } else { "mixtape=info" }
}

fn json_from_env(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}
