//! HTTP handlers for the `/auth` routes.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use super::refresh::{self, RefreshedToken};
use super::SignedToken;
use crate::authorization::Authorized;
use crate::Result;

/// Response body of [`refresh()`].
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
	/// The new token.
	pub token: SignedToken,
}

/// Mints a new token for the requesting user.
///
/// Unlike the automatic refresh, this always produces a new token, regardless of whether the
/// current one is still inside its use window.
#[tracing::instrument(level = "debug", skip_all, fields(user.id = %session.user_id()))]
pub async fn refresh(
	session: Authorized,
	State(state): State<&'static crate::State>,
) -> Result<(RefreshedToken, Json<RefreshResponse>)> {
	let token = refresh::refresh(&state.tokens, session.claims(), Utc::now())?;

	Ok((RefreshedToken(token.clone()), Json(RefreshResponse { token })))
}
