//! Module containing the [`Config`] struct, the API's configuration.

use std::collections::BTreeSet;
use std::env;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chrono::TimeDelta;
use derive_more::Debug;
use url::Url;

/// The role every authenticated identity carries unless configured otherwise.
pub const DEFAULT_ROLE: &str = "game_update";

/// How long a freshly issued token is used as-is, in seconds.
pub const DEFAULT_USE_WINDOW_SECS: u32 = 60 * 60;

/// How long a freshly issued token stays valid, in seconds.
pub const DEFAULT_LIFETIME_SECS: u32 = 60 * 60 * 24 * 7;

/// How many approved screenshots it takes to earn automatic approval.
pub const DEFAULT_AUTO_APPROVE_THRESHOLD: u64 = 10;

/// Configuration values for the API.
///
/// These are read from the environment on startup.
#[derive(Debug, Clone)]
pub struct Config {
	/// The ip address and port the API is going to listen on.
	#[debug("{addr}")]
	pub addr: SocketAddr,

	/// The database URL that the API will connect to.
	#[debug("{}", database_url.as_str())]
	pub database_url: Url,

	/// Token signing configuration.
	pub jwt: JwtConfig,

	/// Screenshot auto-approval configuration.
	pub auto_approve: AutoApproveConfig,

	/// Directory for log files.
	///
	/// If this is not set, logs are only written to stderr.
	pub log_dir: Option<PathBuf>,
}

/// Configuration for issuing and verifying signed tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
	/// The process-wide signing secret.
	#[debug("*****")]
	pub secret: String,

	/// How long a token is used before it gets refreshed.
	pub use_window: TimeDelta,

	/// How long a token stays valid at all.
	pub lifetime: TimeDelta,

	/// Roles stamped onto every identity.
	pub default_roles: BTreeSet<String>,
}

impl JwtConfig {
	/// Creates a new [`JwtConfig`] with the default windows and roles.
	pub fn new<S>(secret: S) -> Self
	where
		S: Into<String>,
	{
		Self {
			secret: secret.into(),
			use_window: TimeDelta::seconds(i64::from(DEFAULT_USE_WINDOW_SECS)),
			lifetime: TimeDelta::seconds(i64::from(DEFAULT_LIFETIME_SECS)),
			default_roles: BTreeSet::from([String::from(DEFAULT_ROLE)]),
		}
	}
}

/// Configuration for the screenshot auto-approval rule.
#[derive(Debug, Clone, Copy)]
pub struct AutoApproveConfig {
	/// Minimum number of approved screenshots before a user's uploads get approved
	/// automatically.
	pub threshold: u64,
}

impl Default for AutoApproveConfig {
	fn default() -> Self {
		Self {
			threshold: DEFAULT_AUTO_APPROVE_THRESHOLD,
		}
	}
}

impl Config {
	/// Creates a new [`Config`] object by reading from the environment.
	pub fn new() -> anyhow::Result<Self> {
		let ip_addr = parse_from_env("DELFRUIT_API_IP")?;
		let port = parse_from_env("DELFRUIT_API_PORT")?;
		let addr = SocketAddr::new(ip_addr, port);
		let database_url = parse_from_env("DATABASE_URL")?;
		let jwt = JwtConfig::from_env()?;
		let threshold = parse_from_env_opt("DELFRUIT_API_AUTO_APPROVE_THRESHOLD")?
			.unwrap_or(DEFAULT_AUTO_APPROVE_THRESHOLD);
		let log_dir = parse_from_env_opt("DELFRUIT_API_LOG_DIR")?;

		Ok(Self {
			addr,
			database_url,
			jwt,
			auto_approve: AutoApproveConfig { threshold },
			log_dir,
		})
	}
}

impl JwtConfig {
	/// Reads the token configuration from the environment.
	///
	/// A missing or empty secret is an error; the API cannot run without one.
	fn from_env() -> anyhow::Result<Self> {
		let secret = parse_from_env::<String>("DELFRUIT_API_JWT_SECRET")?;
		let use_window_secs = parse_from_env_opt::<u32>("DELFRUIT_API_TOKEN_USE_WINDOW")?
			.unwrap_or(DEFAULT_USE_WINDOW_SECS);
		let lifetime_secs = parse_from_env_opt::<u32>("DELFRUIT_API_TOKEN_LIFETIME")?
			.unwrap_or(DEFAULT_LIFETIME_SECS);

		validate_windows(use_window_secs, lifetime_secs)?;

		let default_roles = parse_from_env_opt::<String>("DELFRUIT_API_DEFAULT_ROLES")?
			.map_or_else(
				|| BTreeSet::from([String::from(DEFAULT_ROLE)]),
				|roles| parse_roles(&roles),
			);

		Ok(Self {
			secret,
			use_window: TimeDelta::seconds(i64::from(use_window_secs)),
			lifetime: TimeDelta::seconds(i64::from(lifetime_secs)),
			default_roles,
		})
	}
}

/// Checks the token windows for consistency.
///
/// Tokens carry whole seconds, so a use window shorter than that would refresh on every request.
fn validate_windows(use_window_secs: u32, lifetime_secs: u32) -> anyhow::Result<()> {
	if use_window_secs == 0 {
		anyhow::bail!("`DELFRUIT_API_TOKEN_USE_WINDOW` must be at least 1 second");
	}

	if use_window_secs > lifetime_secs {
		anyhow::bail!(
			"`DELFRUIT_API_TOKEN_USE_WINDOW` ({use_window_secs}s) cannot exceed \
			 `DELFRUIT_API_TOKEN_LIFETIME` ({lifetime_secs}s)"
		);
	}

	Ok(())
}

/// Parses a comma separated list of role names.
fn parse_roles(roles: &str) -> BTreeSet<String> {
	roles
		.split(',')
		.map(str::trim)
		.filter(|role| !role.is_empty())
		.map(String::from)
		.collect()
}

/// Parses an environment variable into a `T`.
fn parse_from_env<T>(var: &str) -> anyhow::Result<T>
where
	T: FromStr,
	T::Err: StdError + Send + Sync + 'static,
{
	let value = env::var(var).with_context(|| format!("missing `{var}` environment variable"))?;

	if value.is_empty() {
		anyhow::bail!("`{var}` cannot be empty");
	}

	<T as FromStr>::from_str(&value).with_context(|| format!("failed to parse `{var}`"))
}

/// Parses an environment variable into an `Option<T>`, returning `None` if the variable is not
/// set or empty.
fn parse_from_env_opt<T>(var: &str) -> anyhow::Result<Option<T>>
where
	T: FromStr,
	T::Err: StdError + Send + Sync + 'static,
{
	let Some(value) = env::var(var).ok() else {
		return Ok(None);
	};

	if value.is_empty() {
		return Ok(None);
	}

	<T as FromStr>::from_str(&value)
		.map(Some)
		.with_context(|| format!("failed to parse `{var}`"))
}
