//! Screenshot moderation side effects.
//!
//! Storing and moderating screenshots happens elsewhere; this module only reacts to the outcome
//! of a moderation decision.

use axum::{routing, Router};

use crate::State;

pub mod auto_approve;

#[doc(inline)]
pub use auto_approve::AutoApprover;

pub mod handlers;

/// Returns a router with routes for `/screenshots`.
pub fn router(state: &'static State) -> Router {
	Router::new()
		.route("/approved", routing::post(handlers::approved))
		.with_state(state)
}
