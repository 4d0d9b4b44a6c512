//! The API's main application state.
//!
//! This is initialized once on startup, and then passed around the application by axum.

use std::sync::Arc;

use anyhow::Context;
use derive_more::Debug;
use sqlx::{MySql, Pool};

use crate::authentication::TokenCodec;
use crate::permissions::{MySqlPermissionStore, PermissionStore};
use crate::screenshots::AutoApprover;

/// The main application state.
///
/// A `'static` reference to this is passed around the application.
#[derive(Debug)]
pub struct State {
	/// Issues and verifies signed tokens.
	pub tokens: TokenCodec,

	/// The source of truth for user permissions.
	#[debug(skip)]
	pub permissions: Arc<dyn PermissionStore>,

	/// Reacts to approved screenshots.
	pub auto_approver: AutoApprover,
}

impl State {
	/// Connects to the database, runs pending migrations, and creates a new [`State`].
	///
	/// **This function should only ever be called once; it leaks memory.**
	pub async fn new(config: crate::Config) -> anyhow::Result<&'static Self> {
		tracing::debug!(url = %config.database_url, "connecting to database");

		let database = Pool::<MySql>::connect(config.database_url.as_str())
			.await
			.context("connect to database")?;

		sqlx::migrate!("./database/migrations")
			.run(&database)
			.await
			.context("run migrations")?;

		let store = Arc::new(MySqlPermissionStore::new(database));

		Ok(Self::with_store(&config, store))
	}

	/// Creates a new [`State`] around an existing permission store and leaks it on the heap.
	pub fn with_store(config: &crate::Config, permissions: Arc<dyn PermissionStore>) -> &'static Self {
		let tokens = TokenCodec::new(&config.jwt);
		let auto_approver = AutoApprover::new(Arc::clone(&permissions), &config.auto_approve);

		Box::leak(Box::new(Self {
			tokens,
			permissions,
			auto_approver,
		}))
	}
}
