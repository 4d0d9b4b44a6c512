//! Ownership checks for owner-gated resources.
//!
//! Many resources (reviews, screenshots, profiles, …) carry the ID of the user who owns them.
//! Mutating such a resource requires being its owner, or an administrator.

use crate::authentication::Claims;
use crate::users::UserID;
use crate::{Error, Result};

/// Checks whether `claims` belong to `owner` or an administrator.
pub fn is_owner_or_admin(claims: &Claims, owner: UserID) -> bool {
	claims.is_admin() || claims.user_id() == owner
}

/// Ensures `claims` belong to `owner` or an administrator.
///
/// Produces a `403 Forbidden` error otherwise.
#[tracing::instrument(
	level = "debug",
	name = "authorization::ownership",
	skip(claims),
	fields(user.id = %claims.user_id(), %owner),
	err(level = "debug"),
)]
pub fn ensure_owner_or_admin(claims: &Claims, owner: UserID) -> Result<()> {
	if is_owner_or_admin(claims, owner) {
		Ok(())
	} else {
		Err(Error::forbidden("you do not own this resource"))
	}
}
