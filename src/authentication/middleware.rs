//! This module contains a [`tower::Service`] for authenticating requests using signed tokens.
//!
//! It will look at the `Authorization: Bearer …` header of every request and decode it using the
//! [`TokenCodec`]. The decoded [`Claims`] are inserted into the request's extensions, where the
//! [`Authorized`] extractor picks them up.
//!
//! - Requests without the header pass through anonymously; whether that is acceptable is up to
//!   the route.
//! - Requests with a header that fails to decode are rejected with `401 Unauthorized`,
//!   regardless of the route.
//! - After the inner service ran, the [refresh policy] is applied, and if a new token was minted
//!   it is attached to the response.
//!
//! [`Authorized`]: crate::authorization::Authorized
//! [refresh policy]: super::refresh

use std::convert::Infallible;
use std::task::{self, Poll};

use axum::extract::Request;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::future::BoxFuture;

use super::refresh::{self, RefreshedToken, TOKEN_HEADER};
use super::{Claims, TokenCodec};
use crate::Error;

/// A layer producing the [`TokenService`] middleware.
#[derive(Debug, Clone)]
pub struct TokenLayer {
	/// For decoding and refreshing tokens.
	codec: TokenCodec,
}

impl TokenLayer {
	/// Creates a new [`TokenLayer`].
	pub const fn new(codec: TokenCodec) -> Self {
		Self { codec }
	}
}

impl<S> tower::Layer<S> for TokenLayer {
	type Service = TokenService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		TokenService {
			codec: self.codec.clone(),
			inner,
		}
	}
}

/// A middleware for decoding tokens from request headers before passing on the request.
///
/// You can create an instance of this service using [`TokenLayer`].
#[derive(Debug, Clone)]
pub struct TokenService<S> {
	/// For decoding and refreshing tokens.
	codec: TokenCodec,

	/// The inner service.
	inner: S,
}

impl<S> tower::Service<Request> for TokenService<S>
where
	S: tower::Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = Infallible;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request) -> Self::Future {
		let codec = self.codec.clone();

		// The clone may not be ready; the instance `poll_ready` was called on is.
		let clone = self.inner.clone();
		let inner = std::mem::replace(&mut self.inner, clone);

		Box::pin(svc_impl(codec, inner, req))
	}
}

/// The actual middleware logic.
#[tracing::instrument(
	level = "debug",
	name = "authentication::middleware",
	skip_all,
	fields(user.id = tracing::field::Empty),
)]
async fn svc_impl<S>(codec: TokenCodec, mut inner: S, mut req: Request) -> Result<Response, Infallible>
where
	S: tower::Service<Request, Response = Response, Error = Infallible> + Send,
	S::Future: Send,
{
	let claims = match decode_authorization(&codec, req.headers()) {
		Ok(claims) => claims,
		Err(error) => return Ok(error.into_response()),
	};

	let Some(claims) = claims else {
		return inner.call(req).await;
	};

	let user_id = claims.user_id();

	tracing::Span::current().record("user.id", format_args!("{user_id}"));

	let refreshed = match refresh::refresh_if_due(&codec, &claims, Utc::now()) {
		Ok(refreshed) => refreshed.map(RefreshedToken),
		Err(error) => {
			tracing::error!(%error, "failed to refresh token");
			None
		}
	};

	req.extensions_mut().insert(claims);

	let mut response = inner.call(req).await?;

	// Picked up by the HTTP logging middleware.
	response.extensions_mut().insert(user_id);

	if let Some(token) = refreshed {
		// Handlers that mint their own token take precedence.
		if !response.headers().contains_key(TOKEN_HEADER) {
			match token.header_value() {
				Ok(value) => {
					response.headers_mut().insert(TOKEN_HEADER, value);
				}
				Err(error) => {
					tracing::error!(%error, "failed to attach refreshed token");
				}
			}
		}
	}

	Ok(response)
}

/// Decodes the `Authorization` header in `headers`, if there is one.
pub(crate) fn decode_authorization(
	codec: &TokenCodec,
	headers: &HeaderMap,
) -> Result<Option<Claims>, Error> {
	let Some(value) = headers.get(header::AUTHORIZATION) else {
		return Ok(None);
	};

	let value = value
		.to_str()
		.map_err(|err| Error::unauthorized().context(err))?;

	codec
		.decode(value)
		.map(Some)
		.map_err(|err| Error::unauthorized().context(err))
}
