//! User identifiers.
//!
//! The rest of the user model (profiles, passwords, bans) is managed elsewhere; the authorization
//! core only ever needs to know *who* a user is.

use std::ops::Deref;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// A user's unique ID.
///
/// This is the `sub` claim of every signed token and the primary key used by the
/// [permission store].
///
/// [permission store]: crate::permissions::PermissionStore
#[repr(transparent)]
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Display,
	Into,
	From,
	Serialize,
	Deserialize,
	sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
#[display("{_0}")]
pub struct UserID(pub u32);

impl Deref for UserID {
	type Target = u32;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
