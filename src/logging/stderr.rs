use std::io;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Used if `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "delfruit_api=info,warn";

/// Provides a tracing layer for emitting logs to STDERR.
pub fn layer<S>() -> impl tracing_subscriber::Layer<S>
where
	S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	tracing_subscriber::fmt::layer()
		.with_writer(io::stderr)
		.with_timer(ChronoUtc::new(String::from("%Y/%m/%d  %H:%M:%S%.5f")))
		.with_span_events(FmtSpan::ACTIVE)
		.pretty()
		.with_filter(filter)
}
