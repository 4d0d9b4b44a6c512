//! Sliding session refresh.
//!
//! Every token has a short *use window* inside its much longer lifetime. While inside the window,
//! the token is used as-is. Once the window is over, the next authenticated request still succeeds
//! with the old token, but the response carries a freshly minted one in the [`TOKEN_HEADER`]
//! header. Clients are expected to replace their stored token with it.
//!
//! The new token is derived purely from the old claims; nothing is looked up in the database.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use chrono::{DateTime, SubsecRound, Utc};

use super::{Claims, EncodeError, SignedToken, TokenCodec};
use crate::Error;

/// The response header carrying a refreshed token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("token");

/// Checks whether `claims` are past their use window at `now`.
///
/// Claims only carry whole seconds, so `now` is truncated before comparing. A refresh is never
/// due within the second the claims were issued in, which means the refreshed token always
/// differs from the old one.
pub fn should_refresh(claims: &Claims, now: DateTime<Utc>) -> bool {
	now.trunc_subsecs(0) > claims.use_before()
}

/// Mints a new token for the identity described by `claims`.
///
/// The new token starts a new use window and lifetime at `now`.
pub fn refresh(
	codec: &TokenCodec,
	claims: &Claims,
	now: DateTime<Utc>,
) -> Result<SignedToken, EncodeError> {
	codec.issue_at(claims.user_id(), claims.username(), claims.is_admin(), now)
}

/// Mints a new token for `claims` if they are past their use window.
#[tracing::instrument(
	level = "debug",
	name = "authentication::refresh",
	skip_all,
	fields(user.id = %claims.user_id(), refreshed = tracing::field::Empty),
	err(level = "debug"),
)]
pub fn refresh_if_due(
	codec: &TokenCodec,
	claims: &Claims,
	now: DateTime<Utc>,
) -> Result<Option<SignedToken>, EncodeError> {
	if !should_refresh(claims, now) {
		return Ok(None);
	}

	let token = refresh(codec, claims, now)?;

	tracing::Span::current().record("refreshed", true);

	Ok(Some(token))
}

/// Response part that sets the [`TOKEN_HEADER`] header.
#[derive(Debug, Clone)]
pub struct RefreshedToken(pub SignedToken);

impl RefreshedToken {
	/// Converts the token into a header value.
	pub fn header_value(&self) -> Result<HeaderValue, Error> {
		HeaderValue::from_str(self.0.as_str())
			.map_err(|err| Error::logic("token is not a valid header value").context(err))
	}
}

impl IntoResponseParts for RefreshedToken {
	type Error = Error;

	fn into_response_parts(self, mut parts: ResponseParts) -> Result<ResponseParts, Self::Error> {
		parts.headers_mut().insert(TOKEN_HEADER, self.header_value()?);

		Ok(parts)
	}
}
