//! Log-capturing facilities.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod stderr;
mod files;

/// Initializes [`tracing-subscriber`].
///
/// Logs always go to stderr. If `log_dir` is set, they are additionally written to daily
/// rotated files in that directory.
///
/// NOTE: the returned [`WorkerGuard`] will perform cleanup for the tracing layer that emits logs
///       to files, which means it has to stay alive until the program exits!
///
/// [`tracing-subscriber`]: tracing_subscriber
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
	let (files_layer, guard) = log_dir
		.map(files::layer)
		.transpose()
		.context("files layer")?
		.unzip();

	tracing_subscriber::registry()
		.with(stderr::layer())
		.with(files_layer)
		.try_init()
		.context("install subscriber")?;

	tracing::info! {
		target: "delfruit_api::audit_log",
		dir = ?log_dir,
		"initialized logging",
	};

	Ok(guard)
}
