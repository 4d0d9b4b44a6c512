//! A [`PermissionStore`] backed by MySQL / MariaDB.
//!
//! Permission state lives in the `UserPermission` table, one row per `(user_id, permission_id)`.
//! A `NULL` in `revoked_until` means the permission is granted.

use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use super::{revoked_indefinitely, Grant, PermissionKind, PermissionSet, PermissionStore, StoreError};
use crate::users::UserID;

/// A [`PermissionStore`] backed by a MySQL database.
#[derive(Debug, Clone)]
pub struct MySqlPermissionStore {
	/// Connection pool to the backing database.
	database: Pool<MySql>,
}

impl MySqlPermissionStore {
	/// Creates a new [`MySqlPermissionStore`].
	pub const fn new(database: Pool<MySql>) -> Self {
		Self { database }
	}

	/// Inserts or replaces the row for `(user_id, kind)`.
	///
	/// This is a single statement, so concurrent writers never leave more than one row behind.
	async fn upsert(
		&self,
		user_id: UserID,
		kind: PermissionKind,
		revoked_until: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		sqlx::query(
			r"
			INSERT INTO
			  UserPermission (user_id, permission_id, revoked_until)
			VALUES
			  (?, ?, ?)
			ON DUPLICATE KEY UPDATE
			  revoked_until = VALUES(revoked_until)
			",
		)
		.bind(user_id)
		.bind(kind.id())
		.bind(revoked_until)
		.execute(&self.database)
		.await?;

		Ok(())
	}
}

#[async_trait]
impl PermissionStore for MySqlPermissionStore {
	#[tracing::instrument(
		level = "debug",
		name = "permissions::mysql::get",
		skip(self),
		err(Debug, level = "debug"),
	)]
	async fn get(&self, user_id: UserID) -> Result<PermissionSet, StoreError> {
		let rows = sqlx::query_as::<_, (u8, Option<DateTime<Utc>>)>(
			r"
			SELECT
			  permission_id,
			  revoked_until
			FROM
			  UserPermission
			WHERE
			  user_id = ?
			",
		)
		.bind(user_id)
		.fetch_all(&self.database)
		.await?;

		let mut permissions = PermissionSet::new(user_id);

		for (permission_id, revoked_until) in rows {
			let Some(kind) = PermissionKind::from_id(permission_id) else {
				tracing::warn!(%user_id, permission_id, "skipping unknown permission");
				continue;
			};

			permissions.insert(kind, Grant { revoked_until });
		}

		Ok(permissions)
	}

	#[tracing::instrument(
		level = "debug",
		name = "permissions::mysql::grant",
		skip(self),
		err(Debug, level = "debug"),
	)]
	async fn grant(&self, user_id: UserID, kind: PermissionKind) -> Result<(), StoreError> {
		self.upsert(user_id, kind, None).await
	}

	#[tracing::instrument(
		level = "debug",
		name = "permissions::mysql::revoke",
		skip(self),
		err(Debug, level = "debug"),
	)]
	async fn revoke(
		&self,
		user_id: UserID,
		kind: PermissionKind,
		until: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		let revoked_until = until.unwrap_or_else(revoked_indefinitely);

		self.upsert(user_id, kind, Some(revoked_until)).await
	}
}
