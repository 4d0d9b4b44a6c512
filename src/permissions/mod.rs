//! Fine-grained user permissions.
//!
//! Every user has a fixed set of [permission kinds](PermissionKind), each of which is either
//! granted or revoked. Most kinds are granted by default ("opt-out") and only disappear when an
//! administrator revokes them; [`PermissionKind::AutoApproveScreenshot`] is the opposite
//! ("opt-in"), and has to be granted explicitly.
//!
//! Revocations can be time-boxed: a revocation with an end date lifts itself once that date has
//! passed, without anybody touching the store again.
//!
//! The [`PermissionStore`] trait abstracts over where this state lives; see [`MySqlPermissionStore`]
//! and [`InMemoryPermissionStore`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::routing::{get, patch};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::users::UserID;
use crate::State;

mod memory;

#[doc(inline)]
pub use memory::InMemoryPermissionStore;

mod mysql;

#[doc(inline)]
pub use mysql::MySqlPermissionStore;

pub mod handlers;

/// Returns a router with the permission routes, meant to be nested under `/users`.
pub fn router(state: &'static State) -> Router {
	Router::new()
		.route("/:user_id/permissions", get(handlers::get))
		.route("/:user_id/permissions/:permission", patch(handlers::update))
		.with_state(state)
}

/// A fine-grained capability.
///
/// Names are matched case-insensitively when parsing, both from strings and in URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionKind {
	/// The user can report content.
	CanReport,

	/// The user can submit new games.
	CanSubmit,

	/// The user can write reviews.
	CanReview,

	/// The user can upload screenshots.
	CanScreenshot,

	/// The user can send private messages.
	CanMessage,

	/// Screenshots uploaded by the user are approved without moderation.
	AutoApproveScreenshot,
}

impl PermissionKind {
	/// All permission kinds.
	pub const ALL: [Self; 6] = [
		Self::CanReport,
		Self::CanSubmit,
		Self::CanReview,
		Self::CanScreenshot,
		Self::CanMessage,
		Self::AutoApproveScreenshot,
	];

	/// The stable ID used in storage.
	pub const fn id(self) -> u8 {
		match self {
			Self::CanReport => 1,
			Self::CanSubmit => 2,
			Self::CanReview => 3,
			Self::CanScreenshot => 4,
			Self::CanMessage => 5,
			Self::AutoApproveScreenshot => 6,
		}
	}

	/// The inverse of [`PermissionKind::id()`].
	pub const fn from_id(id: u8) -> Option<Self> {
		match id {
			1 => Some(Self::CanReport),
			2 => Some(Self::CanSubmit),
			3 => Some(Self::CanReview),
			4 => Some(Self::CanScreenshot),
			5 => Some(Self::CanMessage),
			6 => Some(Self::AutoApproveScreenshot),
			_ => None,
		}
	}

	/// The name used in JSON and URLs.
	pub const fn name(self) -> &'static str {
		match self {
			Self::CanReport => "CAN_REPORT",
			Self::CanSubmit => "CAN_SUBMIT",
			Self::CanReview => "CAN_REVIEW",
			Self::CanScreenshot => "CAN_SCREENSHOT",
			Self::CanMessage => "CAN_MESSAGE",
			Self::AutoApproveScreenshot => "AUTO_APPROVE_SCREENSHOT",
		}
	}

	/// Whether this permission has to be granted explicitly.
	pub const fn is_opt_in(self) -> bool {
		matches!(self, Self::AutoApproveScreenshot)
	}

	/// Whether a user holds this permission when nothing is stored for it.
	pub const fn is_active_by_default(self) -> bool {
		!self.is_opt_in()
	}

	/// The name of the flag mirroring this permission on user profiles, if there is one.
	pub const fn profile_field(self) -> Option<&'static str> {
		match self {
			Self::CanReport => Some("canReport"),
			Self::CanSubmit => Some("canSubmit"),
			Self::CanReview => Some("canReview"),
			Self::CanScreenshot => Some("canScreenshot"),
			Self::CanMessage => Some("canMessage"),
			Self::AutoApproveScreenshot => None,
		}
	}
}

impl fmt::Display for PermissionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// An error that can occur when parsing a string into a [`PermissionKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission `{0}`")]
pub struct UnknownPermission(pub String);

impl FromStr for PermissionKind {
	type Err = UnknownPermission;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.name().eq_ignore_ascii_case(value))
			.ok_or_else(|| UnknownPermission(value.to_owned()))
	}
}

impl<'de> Deserialize<'de> for PermissionKind {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer)?
			.parse()
			.map_err(serde::de::Error::custom)
	}
}

/// The stored state of one permission of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
	/// Until when the permission is revoked; `None` means it is granted.
	pub revoked_until: Option<DateTime<Utc>>,
}

impl Grant {
	/// A granted permission.
	pub const GRANTED: Self = Self {
		revoked_until: None,
	};

	/// Checks whether the permission is revoked at `now`.
	pub fn is_revoked_at(&self, now: DateTime<Utc>) -> bool {
		self.revoked_until.is_some_and(|until| now < until)
	}
}

/// The point in time used for revocations without an end date.
///
/// This is the largest value a MySQL `DATETIME` column can hold.
pub fn revoked_indefinitely() -> DateTime<Utc> {
	DateTime::from_timestamp(253_402_300_799, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// All stored permission state of a single user.
///
/// Kinds without an entry are in their default state, see
/// [`PermissionKind::is_active_by_default()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
	/// The user these permissions belong to.
	pub user_id: UserID,

	/// The stored grants.
	pub permissions: BTreeMap<PermissionKind, Grant>,
}

impl PermissionSet {
	/// Creates an empty [`PermissionSet`] for `user_id`.
	pub const fn new(user_id: UserID) -> Self {
		Self {
			user_id,
			permissions: BTreeMap::new(),
		}
	}

	/// Returns the stored grant for `kind`, if any.
	pub fn get(&self, kind: PermissionKind) -> Option<&Grant> {
		self.permissions.get(&kind)
	}

	/// Stores `grant` for `kind`, replacing any previous state.
	pub fn insert(&mut self, kind: PermissionKind, grant: Grant) {
		self.permissions.insert(kind, grant);
	}

	/// Checks whether the user holds `kind` at `now`.
	///
	/// A stored grant is active unless it is revoked at `now`; without one, the kind's default
	/// applies.
	pub fn is_active(&self, kind: PermissionKind, now: DateTime<Utc>) -> bool {
		self.get(kind)
			.map_or(kind.is_active_by_default(), |grant| !grant.is_revoked_at(now))
	}
}

/// Errors that can occur when talking to a [`PermissionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
	/// Something went wrong communicating with the database.
	#[error("database error")]
	Database(#[from] sqlx::Error),
}

/// The source of truth for user permissions.
///
/// Writes are upserts keyed by `(user, kind)`; concurrent writers race, and the last one wins.
/// Nothing is ever deleted, revocations are lifted by granting again.
#[async_trait]
pub trait PermissionStore: Send + Sync + 'static {
	/// Returns all stored permission state of `user_id`.
	async fn get(&self, user_id: UserID) -> Result<PermissionSet, StoreError>;

	/// Grants `kind` to `user_id`, lifting any revocation.
	///
	/// Granting something that is already granted does nothing.
	async fn grant(&self, user_id: UserID, kind: PermissionKind) -> Result<(), StoreError>;

	/// Revokes `kind` from `user_id` until `until`, or indefinitely if `until` is `None`.
	async fn revoke(
		&self,
		user_id: UserID,
		kind: PermissionKind,
		until: Option<DateTime<Utc>>,
	) -> Result<(), StoreError>;

	/// Checks whether `user_id` holds `kind` at `now`.
	async fn is_active(
		&self,
		user_id: UserID,
		kind: PermissionKind,
		now: DateTime<Utc>,
	) -> Result<bool, StoreError> {
		Ok(self.get(user_id).await?.is_active(kind, now))
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeDelta;

	use super::*;

	#[test]
	fn ids_are_stable() {
		for kind in PermissionKind::ALL {
			assert_eq!(PermissionKind::from_id(kind.id()), Some(kind), "{kind}");
		}

		assert_eq!(PermissionKind::from_id(0), None, "unknown id");
		assert_eq!(PermissionKind::AutoApproveScreenshot.id(), 6, "storage id");
	}

	#[test]
	fn names() -> anyhow::Result<()> {
		assert_eq!("CAN_REVIEW".parse::<PermissionKind>()?, PermissionKind::CanReview, "name");
		assert_eq!(
			serde_json::to_value(PermissionKind::AutoApproveScreenshot)?,
			"AUTO_APPROVE_SCREENSHOT",
			"json",
		);
		assert_eq!(
			serde_json::from_str::<PermissionKind>("\"can_review\"")?,
			"CAN_REVIEW".parse::<PermissionKind>()?,
			"serde and FromStr agree",
		);
		assert_eq!(
			"CAN_FLY".parse::<PermissionKind>(),
			Err(UnknownPermission(String::from("CAN_FLY"))),
			"unknown name",
		);

		Ok(())
	}

	#[test]
	fn defaults() {
		let set = PermissionSet::new(UserID(1));
		let now = Utc::now();

		for kind in PermissionKind::ALL {
			assert_eq!(set.is_active(kind, now), !kind.is_opt_in(), "{kind}");
		}
	}

	#[test]
	fn time_boxed_revocation() {
		let now = Utc::now();
		let mut set = PermissionSet::new(UserID(1));

		set.insert(
			PermissionKind::CanReview,
			Grant {
				revoked_until: Some(now + TimeDelta::days(1)),
			},
		);

		assert!(!set.is_active(PermissionKind::CanReview, now), "revoked now");
		assert!(
			set.is_active(PermissionKind::CanReview, now + TimeDelta::days(2)),
			"revocation lifted",
		);
	}

	#[test]
	fn opt_in_needs_a_grant() {
		let now = Utc::now();
		let mut set = PermissionSet::new(UserID(1));

		assert!(!set.is_active(PermissionKind::AutoApproveScreenshot, now), "no grant");

		set.insert(PermissionKind::AutoApproveScreenshot, Grant::GRANTED);

		assert!(set.is_active(PermissionKind::AutoApproveScreenshot, now), "granted");

		set.insert(
			PermissionKind::AutoApproveScreenshot,
			Grant {
				revoked_until: Some(revoked_indefinitely()),
			},
		);

		assert!(!set.is_active(PermissionKind::AutoApproveScreenshot, now), "revoked");
	}

	#[test]
	fn serializes_as_map() -> anyhow::Result<()> {
		let mut set = PermissionSet::new(UserID(7));

		set.insert(PermissionKind::CanMessage, Grant::GRANTED);

		let json = serde_json::to_value(&set)?;

		assert_eq!(json["userId"], 7, "user id");
		assert!(json["permissions"]["CAN_MESSAGE"]["revokedUntil"].is_null(), "grant");

		Ok(())
	}
}
