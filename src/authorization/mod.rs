//! Everything related to authorization.
//!
//! Authorization happens in two tiers:
//!
//! 1. Coarse [scopes](Scope): a route requires either a signed-in user, or an administrator,
//!    optionally combined with a set of roles. This is decided by [`evaluate()`], purely from the
//!    decoded [`Claims`], and enforced by the [`Authorized`] extractor.
//! 2. Fine-grained, resource-scoped checks: [ownership](ownership) of a resource, or
//!    [permissions](crate::permissions) stored per user. Handlers perform these themselves after
//!    the first tier passed.

use std::fmt;

use crate::authentication::Claims;
use crate::{Error, Result};

mod extract;

#[doc(inline)]
pub use extract::Authorized;

pub mod ownership;
pub mod redaction;

/// The capability tier a route requires.
///
/// Scopes form a hierarchy: anything that satisfies [`Scope::Admin`] also satisfies
/// [`Scope::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
	/// Any signed-in user.
	User,

	/// Administrators only.
	Admin,
}

impl Scope {
	/// The highest scope the given claims satisfy.
	pub const fn of(claims: &Claims) -> Self {
		if claims.is_admin() {
			Self::Admin
		} else {
			Self::User
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::User => "user",
			Self::Admin => "admin",
		})
	}
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// There is no (valid) identity.
	Unauthorized,

	/// There is an identity, but it is not allowed to perform the action.
	Forbidden,

	/// Go ahead.
	Authorized,
}

/// Decides whether `claims` satisfy `scope` and `required_roles`.
///
/// - No claims at all is [`Decision::Unauthorized`].
/// - Claims below `scope` are [`Decision::Forbidden`].
/// - If `required_roles` is non-empty, the claims must hold at least one of them, otherwise
///   they are [`Decision::Forbidden`]. This applies to administrators as well.
#[tracing::instrument(
	level = "debug",
	name = "authorization::evaluate",
	skip(claims),
	fields(user.id = claims.map(|claims| claims.user_id().0)),
	ret,
)]
pub fn evaluate(claims: Option<&Claims>, scope: Scope, required_roles: &[&str]) -> Decision {
	let Some(claims) = claims else {
		return Decision::Unauthorized;
	};

	if Scope::of(claims) < scope {
		return Decision::Forbidden;
	}

	if !required_roles.is_empty() && !claims.has_any_role(required_roles) {
		return Decision::Forbidden;
	}

	Decision::Authorized
}

/// Ensures `claims` belong to a signed-in user holding one of `required_roles` (if any).
pub fn require_user<'c>(claims: Option<&'c Claims>, required_roles: &[&str]) -> Result<&'c Claims> {
	authorize(claims, Scope::User, required_roles)
}

/// Ensures `claims` belong to an administrator holding one of `required_roles` (if any).
pub fn require_admin<'c>(
	claims: Option<&'c Claims>,
	required_roles: &[&str],
) -> Result<&'c Claims> {
	authorize(claims, Scope::Admin, required_roles)
}

/// Runs [`evaluate()`] and turns anything but [`Decision::Authorized`] into an error.
#[track_caller]
pub fn authorize<'c>(
	claims: Option<&'c Claims>,
	scope: Scope,
	required_roles: &[&str],
) -> Result<&'c Claims> {
	match (evaluate(claims, scope, required_roles), claims) {
		(Decision::Authorized, Some(claims)) => Ok(claims),
		(Decision::Forbidden, _) => Err(Error::forbidden(match scope {
			Scope::Admin if claims.is_some_and(|claims| !claims.is_admin()) => {
				"endpoint requires admin permission"
			}
			Scope::User | Scope::Admin => "you do not have the required role",
		})),
		(Decision::Unauthorized | Decision::Authorized, _) => Err(Error::unauthorized()),
	}
}

/// A static authorization requirement for a route.
///
/// This is used as the type parameter of [`Authorized`], so the requirement is spelled out in
/// the handler's signature.
pub trait Requirement: Send + Sync + 'static {
	/// The minimum scope.
	const SCOPE: Scope;

	/// Roles of which the user must hold at least one. Empty means no role is required.
	const ROLES: &'static [&'static str] = &[];
}

/// Requires any signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct User;

impl Requirement for User {
	const SCOPE: Scope = Scope::User;
}

/// Requires an administrator.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl Requirement for Admin {
	const SCOPE: Scope = Scope::Admin;
}
