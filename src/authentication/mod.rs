//! Everything related to authentication.
//!
//! Users authenticate with signed tokens, sent as `Authorization: Bearer <token>`. Tokens are
//! issued by the [`TokenCodec`] and decoded by the [`TokenLayer`] middleware on every request.
//!
//! # Life cycle of a token
//!
//! 1. A user logs in, and a token is issued for them. It carries their ID, name, admin flag
//!    and roles, and is valid for [`JwtConfig::lifetime`].
//! 2. For the first [`JwtConfig::use_window`] of that lifetime, the token is used as-is.
//! 3. After that, every authenticated request is answered with a new token in the
//!    [`TOKEN_HEADER`] response header, starting a new use window and lifetime.
//! 4. A token that has not been used for its entire lifetime expires, and the user has to log in
//!    again.
//!
//! [`JwtConfig::lifetime`]: crate::config::JwtConfig::lifetime
//! [`JwtConfig::use_window`]: crate::config::JwtConfig::use_window
//! [`TOKEN_HEADER`]: refresh::TOKEN_HEADER

use axum::{routing, Router};

use crate::State;

mod claims;

#[doc(inline)]
pub use claims::Claims;

pub mod token;

#[doc(inline)]
pub use token::{DecodeError, EncodeError, SignedToken, TokenCodec};

pub mod refresh;
pub mod middleware;

#[doc(inline)]
pub use middleware::TokenLayer;

pub mod handlers;

/// Returns a router with routes for `/auth`.
pub fn router(state: &'static State) -> Router {
	Router::new()
		.route("/refresh", routing::post(handlers::refresh))
		.with_state(state)
}
