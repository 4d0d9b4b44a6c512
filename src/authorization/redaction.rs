//! Field-level visibility rules for user profiles.
//!
//! Profiles are served and patched as JSON objects by the user routes. Which fields a viewer may
//! see depends on whether they are looking at a single profile or at the user listing:
//!
//! | field                                     | single profile | listing |
//! |-------------------------------------------|----------------|---------|
//! | `email`                                   | owner          | admins  |
//! | `banned`                                  | owner          | admins  |
//! | `canReport`, `canSubmit`, `canReview`, `canScreenshot` | everybody | admins |
//! | `permissions` (stored [`PermissionSet`])  | owner, admins  | nobody  |
//!
//! Listings only include banned users when an administrator asks for them.
//!
//! Non-admins cannot set moderation fields or permission flags through profile patches.
//!
//! [`PermissionSet`]: crate::permissions::PermissionSet

use serde_json::{Map, Value};

use super::ownership;
use crate::authentication::Claims;
use crate::permissions::PermissionKind;
use crate::users::UserID;

/// Profile fields only administrators may change.
pub const ADMIN_ONLY_FIELDS: &[&str] = &["banned", "unsuccessfulLogins", "lastIp", "dateLastLogin"];

/// Permission flags hidden from non-admins in listings.
pub const LISTING_PERMISSION_FLAGS: &[&str] = &["canReport", "canSubmit", "canReview", "canScreenshot"];

/// Which sensitive profile fields a viewer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileVisibility {
	/// The `email` field.
	pub email: bool,

	/// The `banned` field.
	pub banned: bool,

	/// The [`LISTING_PERMISSION_FLAGS`].
	pub permission_flags: bool,

	/// Whether the stored permissions may be attached to the profile.
	pub permission_set: bool,
}

impl ProfileVisibility {
	/// Computes what `viewer` may see of the single profile belonging to `subject`.
	pub fn profile(viewer: Option<&Claims>, subject: UserID) -> Self {
		let is_owner = viewer.is_some_and(|claims| claims.user_id() == subject);

		Self {
			email: is_owner,
			banned: is_owner,
			permission_flags: true,
			permission_set: viewer.is_some_and(|claims| ownership::is_owner_or_admin(claims, subject)),
		}
	}

	/// Computes what `viewer` may see of each entry in the user listing.
	pub fn listing(viewer: Option<&Claims>) -> Self {
		let is_admin = viewer.is_some_and(Claims::is_admin);

		Self {
			email: is_admin,
			banned: is_admin,
			permission_flags: is_admin,
			permission_set: false,
		}
	}

	/// Removes every field from `profile` that is not visible.
	pub fn redact(self, profile: &mut Map<String, Value>) {
		if !self.email {
			profile.remove("email");
		}

		if !self.banned {
			profile.remove("banned");
		}

		if !self.permission_flags {
			for field in LISTING_PERMISSION_FLAGS {
				profile.remove(*field);
			}
		}

		if !self.permission_set {
			profile.remove("permissions");
		}
	}
}

/// Whether `viewer` may see banned users in listings.
pub fn can_list_banned_users(viewer: Option<&Claims>) -> bool {
	viewer.is_some_and(Claims::is_admin)
}

/// Removes every field from `patch` that `author` is not allowed to set.
///
/// Returns the names of the removed fields.
#[tracing::instrument(
	level = "debug",
	name = "authorization::redaction::sanitize_patch",
	skip_all,
	fields(user.id = %author.user_id()),
	ret,
)]
pub fn sanitize_patch(patch: &mut Map<String, Value>, author: &Claims) -> Vec<String> {
	if author.is_admin() {
		return Vec::new();
	}

	// Permission flags mirror the permission store, which only admins write to.
	let permission_fields = PermissionKind::ALL
		.into_iter()
		.filter_map(PermissionKind::profile_field);

	ADMIN_ONLY_FIELDS
		.iter()
		.copied()
		.chain(permission_fields)
		.filter_map(|field| patch.remove(field).map(|_| field.to_owned()))
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::test;

	fn profile() -> Map<String, Value> {
		let json = json!({
			"id": 2,
			"name": "kid",
			"email": "kid@example.com",
			"banned": false,
			"canReport": true,
			"canScreenshot": true,
			"canMessage": false,
			"unsuccessfulLogins": 0,
			"permissions": { "userId": 2, "permissions": {} },
		});

		match json {
			Value::Object(map) => map,
			_ => unreachable!("literal is an object"),
		}
	}

	#[test]
	fn anonymous_profile_view() {
		let mut profile = profile();

		ProfileVisibility::profile(None, UserID(2)).redact(&mut profile);

		assert!(!profile.contains_key("email"), "email");
		assert!(!profile.contains_key("banned"), "banned");
		assert!(!profile.contains_key("permissions"), "permission set");
		assert!(profile.contains_key("canReport"), "permission flags stay on profiles");
		assert!(profile.contains_key("name"), "public field");
	}

	#[test]
	fn owners_see_their_whole_profile() {
		let owner = test::claims(UserID(2), false);
		let mut profile = profile();

		ProfileVisibility::profile(Some(&owner), UserID(2)).redact(&mut profile);

		assert_eq!(profile, self::profile(), "owner view was redacted");
	}

	#[test]
	fn admins_see_permissions_but_not_private_fields() {
		let admin = test::claims(UserID(1), true);
		let mut profile = profile();

		ProfileVisibility::profile(Some(&admin), UserID(2)).redact(&mut profile);

		assert!(!profile.contains_key("email"), "email");
		assert!(!profile.contains_key("banned"), "banned");
		assert!(profile.contains_key("permissions"), "permission set");
		assert!(profile.contains_key("canScreenshot"), "permission flag");
	}

	#[test]
	fn strangers_do_not_see_permissions() {
		let stranger = test::claims(UserID(3), false);
		let mut profile = profile();

		ProfileVisibility::profile(Some(&stranger), UserID(2)).redact(&mut profile);

		assert!(!profile.contains_key("permissions"), "permission set");
		assert!(!profile.contains_key("email"), "email");
	}

	#[test]
	fn admin_listing_view() {
		let admin = test::claims(UserID(1), true);
		let mut entry = profile();

		ProfileVisibility::listing(Some(&admin)).redact(&mut entry);

		assert!(entry.contains_key("email"), "email");
		assert!(entry.contains_key("banned"), "banned");
		assert!(entry.contains_key("canReport"), "permission flag");
		assert!(!entry.contains_key("permissions"), "listings never carry permission sets");
	}

	#[test]
	fn user_listing_view() {
		let user = test::claims(UserID(2), false);

		for viewer in [None, Some(&user)] {
			let mut entry = profile();

			ProfileVisibility::listing(viewer).redact(&mut entry);

			assert!(!entry.contains_key("email"), "email, even for the owner");
			assert!(!entry.contains_key("banned"), "banned");
			assert!(!entry.contains_key("canReport"), "canReport");
			assert!(!entry.contains_key("canScreenshot"), "canScreenshot");
			assert!(entry.contains_key("canMessage"), "canMessage is not hidden");
			assert!(entry.contains_key("name"), "public field");
		}
	}

	#[test]
	fn banned_listings() {
		let user = test::claims(UserID(2), false);
		let admin = test::claims(UserID(1), true);

		assert!(!can_list_banned_users(None), "anonymous");
		assert!(!can_list_banned_users(Some(&user)), "user");
		assert!(can_list_banned_users(Some(&admin)), "admin");
	}

	#[test]
	fn users_cannot_patch_moderation_fields() {
		let user = test::claims(UserID(2), false);
		let mut patch = profile();
		let removed = sanitize_patch(&mut patch, &user);

		assert!(removed.contains(&String::from("banned")), "banned");
		assert!(removed.contains(&String::from("unsuccessfulLogins")), "login counter");
		assert!(removed.contains(&String::from("canReport")), "permission flag");
		assert!(patch.contains_key("email"), "own email");
		assert!(patch.contains_key("name"), "own name");
	}

	#[test]
	fn admins_can_patch_anything() {
		let admin = test::claims(UserID(1), true);
		let mut patch = profile();

		assert!(sanitize_patch(&mut patch, &admin).is_empty(), "admin patch was sanitized");
		assert_eq!(patch, profile(), "admin patch was modified");
	}
}
