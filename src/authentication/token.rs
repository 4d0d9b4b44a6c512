//! Encoding and decoding of signed identity tokens.
//!
//! Tokens are HS256 [JWTs] signed with a single process-wide secret. The payload is a set of
//! [`Claims`]. There is no revocation list; a token stays valid until it expires.
//!
//! [JWTs]: https://jwt.io/introduction/

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Display;
use serde::Serialize;
use thiserror::Error;

use super::Claims;
use crate::config::JwtConfig;
use crate::users::UserID;

/// The prefix of an `Authorization` header carrying a token.
pub const BEARER_PREFIX: &str = "Bearer ";

/// An encoded, signed token.
#[derive(Display, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
	/// Returns the encoded token.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for SignedToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SignedToken").field(&"*****").finish()
	}
}

/// Errors that can occur when decoding a token.
///
/// These are distinct so callers can log them, but they should all be reported to clients the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// The token is missing the bearer prefix, or is not a well-formed JWT.
	#[error("malformed token")]
	MalformedToken,

	/// The token's signature does not match.
	#[error("invalid token signature")]
	InvalidSignature,

	/// The token has expired.
	#[error("token has expired")]
	Expired,
}

/// An error that can occur when signing a token.
///
/// If this ever happens, that's a bug.
#[derive(Debug, Error)]
#[error("failed to encode token")]
pub struct EncodeError(#[from] jwt::errors::Error);

/// Issues and verifies signed tokens.
///
/// This type is cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
	/// Keys and settings derived from the configuration.
	inner: Arc<Inner>,
}

/// The shared state of a [`TokenCodec`].
struct Inner {
	/// Header data to use when signing tokens.
	header: jwt::Header,

	/// Secret key to use when signing tokens.
	encoding_key: jwt::EncodingKey,

	/// Secret key to use when verifying tokens.
	decoding_key: jwt::DecodingKey,

	/// Validation steps when verifying tokens.
	validation: jwt::Validation,

	/// See [`JwtConfig::use_window`].
	use_window: TimeDelta,

	/// See [`JwtConfig::lifetime`].
	lifetime: TimeDelta,

	/// See [`JwtConfig::default_roles`].
	default_roles: BTreeSet<String>,
}

impl fmt::Debug for TokenCodec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenCodec")
			.field("use_window", &self.inner.use_window)
			.field("lifetime", &self.inner.lifetime)
			.field("default_roles", &self.inner.default_roles)
			.finish_non_exhaustive()
	}
}

impl TokenCodec {
	/// Creates a new [`TokenCodec`].
	pub fn new(config: &JwtConfig) -> Self {
		let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);

		// `sub` is an integer, so only `exp` can be required.
		validation.set_required_spec_claims(&["exp"]);
		validation.leeway = 0;

		Self {
			inner: Arc::new(Inner {
				header: jwt::Header::new(jwt::Algorithm::HS256),
				encoding_key: jwt::EncodingKey::from_secret(config.secret.as_bytes()),
				decoding_key: jwt::DecodingKey::from_secret(config.secret.as_bytes()),
				validation,
				use_window: config.use_window,
				lifetime: config.lifetime,
				default_roles: config.default_roles.clone(),
			}),
		}
	}

	/// Issues a new token for the given user.
	pub fn issue(
		&self,
		user_id: UserID,
		username: &str,
		is_admin: bool,
	) -> Result<SignedToken, EncodeError> {
		self.issue_at(user_id, username, is_admin, Utc::now())
	}

	/// Issues a new token for the given user, as if the current time was `now`.
	#[tracing::instrument(
		level = "debug",
		name = "authentication::token::issue",
		skip(self, username),
		fields(user.id = %user_id),
		err(level = "debug"),
	)]
	pub fn issue_at(
		&self,
		user_id: UserID,
		username: &str,
		is_admin: bool,
		now: DateTime<Utc>,
	) -> Result<SignedToken, EncodeError> {
		let claims = Claims::new(
			user_id,
			username,
			is_admin,
			self.inner.default_roles.clone(),
			now,
			self.inner.use_window,
			self.inner.lifetime,
		);

		let token = jwt::encode(&self.inner.header, &claims, &self.inner.encoding_key)?;

		Ok(SignedToken(token))
	}

	/// Decodes the value of an `Authorization` header.
	///
	/// The value must be of the form `Bearer <token>`.
	pub fn decode(&self, authorization: &str) -> Result<Claims, DecodeError> {
		let token = authorization
			.strip_prefix(BEARER_PREFIX)
			.ok_or(DecodeError::MalformedToken)?;

		self.verify(token)
	}

	/// Verifies a raw token and returns its claims.
	///
	/// Claims past their use window still verify; see [`crate::authentication::refresh`].
	#[tracing::instrument(
		level = "debug",
		name = "authentication::token::verify",
		skip_all,
		err(level = "debug"),
	)]
	pub fn verify(&self, token: &str) -> Result<Claims, DecodeError> {
		let mut claims = jwt::decode::<Claims>(token, &self.inner.decoding_key, &self.inner.validation)
			.map(|data| data.claims)
			.map_err(|error| {
				tracing::debug!(%error, "rejecting token");
				classify(&error)
			})?;

		claims.extend_roles(&self.inner.default_roles);

		Ok(claims)
	}
}

/// Maps a [`jwt`] error onto the failure kinds clients are allowed to distinguish.
fn classify(error: &jwt::errors::Error) -> DecodeError {
	use jwt::errors::ErrorKind as E;

	match error.kind() {
		E::InvalidSignature | E::InvalidAlgorithm | E::InvalidAlgorithmName => {
			DecodeError::InvalidSignature
		}
		E::ExpiredSignature => DecodeError::Expired,
		_ => DecodeError::MalformedToken,
	}
}
