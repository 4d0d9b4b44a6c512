use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Provides a tracing layer writing JSON lines into daily rotated files inside `log_dir`.
///
/// Only events emitted by the API itself are captured.
pub fn layer<S>(log_dir: &Path) -> anyhow::Result<(impl tracing_subscriber::Layer<S>, WorkerGuard)>
where
	S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
	fs::create_dir_all(log_dir).with_context(|| format!("create `{}`", log_dir.display()))?;

	let (writer, guard) = tracing_appender::rolling::Builder::new()
		.rotation(Rotation::DAILY)
		.filename_prefix("delfruit-api")
		.filename_suffix("log")
		.build(log_dir)
		.map(tracing_appender::non_blocking)
		.context("initialize file appender")?;

	let layer = tracing_subscriber::fmt::layer()
		.json()
		.with_writer(writer)
		.with_ansi(false)
		.with_filter(FilterFn::new(|metadata| metadata.target().starts_with("delfruit_api")));

	Ok((layer, guard))
}
