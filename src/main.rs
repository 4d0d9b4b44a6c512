use anyhow::Context;
use delfruit_api::Config;

mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	if let Err(error) = dotenvy::dotenv() {
		eprintln!("Failed to load `.env` file: {error}");
	}

	let config = Config::new().context("load config")?;
	let _guard = logging::init(config.log_dir.as_deref()).context("initialize logging")?;

	if cfg!(not(feature = "production")) {
		tracing::warn!("running in development mode");
	}

	delfruit_api::run(config).await
}
