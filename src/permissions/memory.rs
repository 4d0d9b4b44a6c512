//! An in-process [`PermissionStore`].

use std::collections::HashMap;

use axum::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{revoked_indefinitely, Grant, PermissionKind, PermissionSet, PermissionStore, StoreError};
use crate::users::UserID;

/// A [`PermissionStore`] that keeps everything in memory.
///
/// Useful for tests and local development; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
	/// Stored permission sets, keyed by user.
	sets: RwLock<HashMap<UserID, PermissionSet>>,
}

impl InMemoryPermissionStore {
	/// Creates a new, empty, [`InMemoryPermissionStore`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `grant` for `(user_id, kind)`.
	async fn upsert(&self, user_id: UserID, kind: PermissionKind, grant: Grant) {
		self.sets
			.write()
			.await
			.entry(user_id)
			.or_insert_with(|| PermissionSet::new(user_id))
			.insert(kind, grant);
	}
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
	async fn get(&self, user_id: UserID) -> Result<PermissionSet, StoreError> {
		Ok(self
			.sets
			.read()
			.await
			.get(&user_id)
			.cloned()
			.unwrap_or_else(|| PermissionSet::new(user_id)))
	}

	#[tracing::instrument(level = "debug", name = "permissions::memory::grant", skip(self))]
	async fn grant(&self, user_id: UserID, kind: PermissionKind) -> Result<(), StoreError> {
		self.upsert(user_id, kind, Grant::GRANTED).await;

		Ok(())
	}

	#[tracing::instrument(level = "debug", name = "permissions::memory::revoke", skip(self))]
	async fn revoke(
		&self,
		user_id: UserID,
		kind: PermissionKind,
		until: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		let revoked_until = until.unwrap_or_else(revoked_indefinitely);

		self.upsert(user_id, kind, Grant {
			revoked_until: Some(revoked_until),
		})
		.await;

		Ok(())
	}
}
