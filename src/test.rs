//! Shared fixtures for unit tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use url::Url;

use crate::authentication::Claims;
use crate::config::{AutoApproveConfig, JwtConfig, DEFAULT_LIFETIME_SECS, DEFAULT_USE_WINDOW_SECS};
use crate::permissions::InMemoryPermissionStore;
use crate::users::UserID;
use crate::{Config, State};

/// The signing secret used by every test.
pub(crate) const SECRET: &str = "test-secret";

/// A configuration that does not depend on the environment.
pub(crate) fn config() -> Config {
	Config {
		addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0),
		database_url: Url::parse("mysql://localhost/delfruit").unwrap(),
		jwt: JwtConfig::new(SECRET),
		auto_approve: AutoApproveConfig::default(),
		log_dir: None,
	}
}

/// A fresh application state backed by an in-memory permission store.
///
/// Every call leaks a new state, so tests never share permissions.
pub(crate) fn state() -> &'static State {
	State::with_store(&config(), Arc::new(InMemoryPermissionStore::new()))
}

/// Claims issued just now, carrying only the default role.
pub(crate) fn claims(user_id: UserID, is_admin: bool) -> Claims {
	claims_with_roles(user_id, is_admin, [crate::config::DEFAULT_ROLE])
}

/// Claims issued just now, carrying exactly `roles`.
pub(crate) fn claims_with_roles<I>(user_id: UserID, is_admin: bool, roles: I) -> Claims
where
	I: IntoIterator<Item = &'static str>,
{
	Claims::new(
		user_id,
		format!("user-{user_id}"),
		is_admin,
		roles.into_iter().map(String::from).collect(),
		Utc::now(),
		TimeDelta::seconds(i64::from(DEFAULT_USE_WINDOW_SECS)),
		TimeDelta::seconds(i64::from(DEFAULT_LIFETIME_SECS)),
	)
}

#[ctor::ctor]
fn setup() {
	use std::{env, io};

	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::EnvFilter;

	if let Ok(rust_log) = env::var("RUST_TEST_LOG") {
		tracing_subscriber::fmt()
			.with_target(true)
			.with_writer(io::stderr)
			.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
			.compact()
			.with_env_filter(EnvFilter::new(rust_log))
			.init();
	}
}
