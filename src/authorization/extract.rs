//! The [`Authorized`] extractor.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request;

use super::{authorize, Requirement, User};
use crate::authentication::middleware::decode_authorization;
use crate::authentication::Claims;
use crate::{Error, Result, State};

/// An authorized identity.
///
/// Using this type as an extractor in a handler makes the handler require the [`Requirement`]
/// `R`. Requests that do not meet it are rejected with `401 Unauthorized` (no identity) or
/// `403 Forbidden` (insufficient scope or roles) before the handler runs.
///
/// The claims are usually decoded by the [`TokenLayer`] middleware; if that is not installed,
/// the `Authorization` header is decoded here instead.
///
/// [`TokenLayer`]: crate::authentication::TokenLayer
///
/// # Example
///
/// ```rust,ignore
/// use delfruit_api::authorization::{Admin, Authorized};
///
/// async fn handler(admin: Authorized<Admin>) {
///     tracing::info!(admin.id = %admin.user_id(), "hello, admin");
/// }
/// ```
pub struct Authorized<R = User> {
	/// The verified claims.
	claims: Claims,

	/// The requirement the claims were checked against.
	_requirement: PhantomData<fn() -> R>,
}

impl<R> Authorized<R> {
	/// The verified claims.
	pub const fn claims(&self) -> &Claims {
		&self.claims
	}
}

impl<R> fmt::Debug for Authorized<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Authorized")
			.field("claims", &self.claims)
			.finish_non_exhaustive()
	}
}

impl<R> Deref for Authorized<R> {
	type Target = Claims;

	fn deref(&self) -> &Self::Target {
		&self.claims
	}
}

#[async_trait]
impl<R> FromRequestParts<&'static State> for Authorized<R>
where
	R: Requirement,
{
	type Rejection = Error;

	#[tracing::instrument(
		level = "debug",
		name = "authorization::extract",
		skip_all,
		fields(scope = %R::SCOPE, roles = ?R::ROLES),
		err(level = "debug"),
	)]
	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &&'static State,
	) -> Result<Self> {
		let claims = match parts.extensions.get::<Claims>() {
			Some(claims) => Some(claims.clone()),
			None => decode_authorization(&state.tokens, &parts.headers)?,
		};

		authorize(claims.as_ref(), R::SCOPE, R::ROLES)?;

		let claims = claims.ok_or_else(Error::unauthorized)?;

		Ok(Self {
			claims,
			_requirement: PhantomData,
		})
	}
}
