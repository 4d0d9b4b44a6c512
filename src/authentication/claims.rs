//! The payload of a signed token.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::users::UserID;

/// The verified identity of a user.
///
/// Claims are immutable once issued. When a session is refreshed, a whole new set of claims is
/// minted (see [`crate::authentication::refresh`]).
///
/// The timestamps always satisfy `issued_at <= use_before <= expires_at`, and are stored with
/// second precision, since that is what ends up inside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// The user's ID.
	#[serde(rename = "sub")]
	user_id: UserID,

	/// The user's name at the time of issuance.
	username: String,

	/// Whether the user is an administrator.
	#[serde(rename = "isAdmin", default)]
	is_admin: bool,

	/// Coarse roles the user holds.
	#[serde(default)]
	roles: BTreeSet<String>,

	/// When the token was issued.
	#[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
	issued_at: DateTime<Utc>,

	/// After this point the token is still valid, but should be replaced.
	#[serde(rename = "useExp", with = "chrono::serde::ts_seconds")]
	use_before: DateTime<Utc>,

	/// After this point the token is rejected.
	#[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
	expires_at: DateTime<Utc>,
}

impl Claims {
	/// Creates a new set of claims issued at `issued_at`.
	///
	/// `use_window` is clamped to `lifetime`, so the ordering of the timestamps always holds.
	pub fn new<S>(
		user_id: UserID,
		username: S,
		is_admin: bool,
		roles: BTreeSet<String>,
		issued_at: DateTime<Utc>,
		use_window: TimeDelta,
		lifetime: TimeDelta,
	) -> Self
	where
		S: Into<String>,
	{
		let issued_at = issued_at.trunc_subsecs(0);
		let lifetime = lifetime.max(TimeDelta::zero());
		let use_window = use_window.clamp(TimeDelta::zero(), lifetime);

		Self {
			user_id,
			username: username.into(),
			is_admin,
			roles,
			issued_at,
			use_before: issued_at + use_window,
			expires_at: issued_at + lifetime,
		}
	}

	/// The user's ID.
	pub const fn user_id(&self) -> UserID {
		self.user_id
	}

	/// The user's name.
	pub fn username(&self) -> &str {
		&self.username
	}

	/// Whether the user is an administrator.
	pub const fn is_admin(&self) -> bool {
		self.is_admin
	}

	/// The roles the user holds.
	pub const fn roles(&self) -> &BTreeSet<String> {
		&self.roles
	}

	/// Checks whether the user holds at least one of the given `roles`.
	pub fn has_any_role(&self, roles: &[&str]) -> bool {
		roles.iter().any(|role| self.roles.contains(*role))
	}

	/// When these claims were issued.
	pub const fn issued_at(&self) -> DateTime<Utc> {
		self.issued_at
	}

	/// The end of the use window.
	pub const fn use_before(&self) -> DateTime<Utc> {
		self.use_before
	}

	/// When these claims expire.
	pub const fn expires_at(&self) -> DateTime<Utc> {
		self.expires_at
	}

	/// Adds `roles` to the claims' role set.
	///
	/// Every authenticated identity carries the configured default roles, including ones decoded
	/// from tokens that were minted without them.
	pub(crate) fn extend_roles<'a, I>(&mut self, roles: I)
	where
		I: IntoIterator<Item = &'a String>,
	{
		self.roles.extend(roles.into_iter().cloned());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn use_window_is_clamped_to_lifetime() {
		let now = Utc::now();
		let claims = Claims::new(
			UserID(1),
			"kid",
			false,
			BTreeSet::new(),
			now,
			TimeDelta::days(30),
			TimeDelta::days(7),
		);

		assert_eq!(claims.use_before(), claims.expires_at(), "use window exceeds lifetime");
		assert!(claims.issued_at() <= claims.use_before(), "issued after use window");
	}

	#[test]
	fn serializes_original_field_names() -> anyhow::Result<()> {
		let issued_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
		let claims = Claims::new(
			UserID(42),
			"kid",
			true,
			BTreeSet::from([String::from("game_update")]),
			issued_at,
			TimeDelta::hours(1),
			TimeDelta::days(7),
		);

		let json = serde_json::to_value(&claims)?;

		assert_eq!(json["sub"], 42, "user id");
		assert_eq!(json["username"], "kid", "username");
		assert_eq!(json["isAdmin"], true, "admin flag");
		assert_eq!(json["roles"][0], "game_update", "roles");
		assert_eq!(json["iat"], 1_700_000_000_i64, "issued at");
		assert_eq!(json["useExp"], 1_700_003_600_i64, "use before");
		assert_eq!(json["exp"], 1_700_604_800_i64, "expires at");

		Ok(())
	}

	#[test]
	fn tokens_without_roles_still_decode() -> anyhow::Result<()> {
		let json = serde_json::json!({
			"sub": 7,
			"username": "guy",
			"isAdmin": false,
			"iat": 1_700_000_000_i64,
			"useExp": 1_700_003_600_i64,
			"exp": 1_700_604_800_i64,
		});

		let claims = serde_json::from_value::<Claims>(json)?;

		assert_eq!(claims.user_id(), UserID(7), "user id");
		assert!(claims.roles().is_empty(), "roles should default to empty");

		Ok(())
	}

	#[test]
	fn role_intersection() {
		let claims = Claims::new(
			UserID(1),
			"kid",
			false,
			BTreeSet::from([String::from("game_update")]),
			Utc::now(),
			TimeDelta::hours(1),
			TimeDelta::days(7),
		);

		assert!(claims.has_any_role(&["superuser", "game_update"]), "should intersect");
		assert!(!claims.has_any_role(&["superuser"]), "should not intersect");
		assert!(!claims.has_any_role(&[]), "empty requirement never intersects");
	}
}
