//! HTTP handlers for the `/users/{user_id}/permissions` routes.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{PermissionKind, PermissionSet};
use crate::authorization::{ownership, Admin, Authorized};
use crate::extract::Path;
use crate::users::UserID;
use crate::{Error, Result};

/// Fetch the stored permissions of a user.
///
/// Users can see their own permissions; administrators can see everybody's.
#[tracing::instrument(level = "debug", skip(state, session), fields(session.user.id = %session.user_id()))]
pub async fn get(
	session: Authorized,
	State(state): State<&'static crate::State>,
	Path(user_id): Path<UserID>,
) -> Result<Json<PermissionSet>> {
	ownership::ensure_owner_or_admin(&session, user_id)?;

	let permissions = state.permissions.get(user_id).await?;

	Ok(Json(permissions))
}

/// Request body for [`update()`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdate {
	/// Until when to revoke the permission.
	///
	/// `null` or missing revokes it indefinitely.
	#[serde(default)]
	pub revoked_until: Option<DateTime<Utc>>,
}

/// Grant or revoke a permission.
///
/// Without a request body, the permission is granted. With a body, it is revoked until
/// `revokedUntil`, or indefinitely if that is `null`.
#[tracing::instrument(level = "debug", skip(state, admin, body), fields(admin.id = %admin.user_id()))]
pub async fn update(
	admin: Authorized<Admin>,
	State(state): State<&'static crate::State>,
	Path((user_id, permission)): Path<(UserID, PermissionKind)>,
	body: Bytes,
) -> Result<Json<PermissionSet>> {
	let update = if body.is_empty() {
		None
	} else {
		serde_json::from_slice::<PermissionUpdate>(&body)
			.map(Some)
			.map_err(|err| Error::invalid("request body").context(err))?
	};

	match update {
		None => {
			state.permissions.grant(user_id, permission).await?;

			tracing::info! {
				target: "delfruit_api::audit_log",
				admin_id = %admin.user_id(),
				%user_id,
				%permission,
				"granted permission",
			};
		}
		Some(PermissionUpdate { revoked_until }) => {
			state
				.permissions
				.revoke(user_id, permission, revoked_until)
				.await?;

			tracing::info! {
				target: "delfruit_api::audit_log",
				admin_id = %admin.user_id(),
				%user_id,
				%permission,
				?revoked_until,
				"revoked permission",
			};
		}
	}

	let permissions = state.permissions.get(user_id).await?;

	Ok(Json(permissions))
}

#[cfg(test)]
mod tests {
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Method, Request, StatusCode};
	use chrono::TimeDelta;
	use tower::ServiceExt;

	use super::*;
	use crate::permissions::revoked_indefinitely;
	use crate::test;

	fn request(
		method: Method,
		uri: &str,
		token: &str,
		body: Option<serde_json::Value>,
	) -> anyhow::Result<Request<Body>> {
		let builder = Request::builder()
			.method(method)
			.uri(uri)
			.header(header::AUTHORIZATION, format!("Bearer {token}"));

		Ok(match body {
			None => builder.body(Body::empty())?,
			Some(json) => builder
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(serde_json::to_vec(&json)?))?,
		})
	}

	#[tokio::test]
	async fn non_admins_cannot_update() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(2), "kid", false)?;
		let response = crate::router(state)
			.oneshot(request(Method::PATCH, "/users/2/permissions/CAN_REVIEW", token.as_str(), None)?)
			.await?;

		assert_eq!(response.status(), StatusCode::FORBIDDEN, "status");
		assert!(
			state.permissions.get(UserID(2)).await?.permissions.is_empty(),
			"store was modified",
		);

		Ok(())
	}

	#[tokio::test]
	async fn admins_can_revoke_and_grant() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;
		let until = Utc::now() + TimeDelta::days(1);

		let response = crate::router(state)
			.oneshot(request(
				Method::PATCH,
				"/users/2/permissions/CAN_REVIEW",
				token.as_str(),
				Some(serde_json::json!({ "revokedUntil": until })),
			)?)
			.await?;

		assert_eq!(response.status(), StatusCode::OK, "revoke status");
		assert!(
			!state
				.permissions
				.is_active(UserID(2), PermissionKind::CanReview, Utc::now())
				.await?,
			"permission still active",
		);

		let response = crate::router(state)
			.oneshot(request(Method::PATCH, "/users/2/permissions/CAN_REVIEW", token.as_str(), None)?)
			.await?;

		assert_eq!(response.status(), StatusCode::OK, "grant status");
		assert!(
			state
				.permissions
				.is_active(UserID(2), PermissionKind::CanReview, Utc::now())
				.await?,
			"permission still revoked",
		);

		Ok(())
	}

	#[tokio::test]
	async fn null_revokes_indefinitely() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;
		let response = crate::router(state)
			.oneshot(request(
				Method::PATCH,
				"/users/2/permissions/CAN_MESSAGE",
				token.as_str(),
				Some(serde_json::json!({ "revokedUntil": null })),
			)?)
			.await?;

		assert_eq!(response.status(), StatusCode::OK, "status");

		let set = state.permissions.get(UserID(2)).await?;

		assert_eq!(
			set.get(PermissionKind::CanMessage).and_then(|grant| grant.revoked_until),
			Some(revoked_indefinitely()),
			"not revoked indefinitely",
		);

		Ok(())
	}

	#[tokio::test]
	async fn owners_can_read_their_permissions() -> anyhow::Result<()> {
		let state = test::state();
		let owner = state.tokens.issue(UserID(2), "kid", false)?;
		let stranger = state.tokens.issue(UserID(3), "guy", false)?;
		let admin = state.tokens.issue(UserID(1), "boshy", true)?;

		for (token, expected) in [
			(&owner, StatusCode::OK),
			(&stranger, StatusCode::FORBIDDEN),
			(&admin, StatusCode::OK),
		] {
			let response = crate::router(state)
				.oneshot(request(Method::GET, "/users/2/permissions", token.as_str(), None)?)
				.await?;

			assert_eq!(response.status(), expected, "unexpected status");
		}

		Ok(())
	}

	#[tokio::test]
	async fn malformed_bodies_are_rejected() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;
		let response = crate::router(state)
			.oneshot(request(
				Method::PATCH,
				"/users/2/permissions/AUTO_APPROVE_SCREENSHOT",
				token.as_str(),
				Some(serde_json::json!({ "revokedUntil": "tomorrow" })),
			)?)
			.await?;

		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "status");
		assert!(
			state.permissions.get(UserID(2)).await?.permissions.is_empty(),
			"store was modified",
		);

		Ok(())
	}

	#[tokio::test]
	async fn permission_names_ignore_case() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;
		let response = crate::router(state)
			.oneshot(request(
				Method::PATCH,
				"/users/2/permissions/can_review",
				token.as_str(),
				Some(serde_json::json!({})),
			)?)
			.await?;

		assert_eq!(response.status(), StatusCode::OK, "status");
		assert!(
			!state
				.permissions
				.is_active(UserID(2), PermissionKind::CanReview, Utc::now())
				.await?,
			"permission still active",
		);

		Ok(())
	}

	#[tokio::test]
	async fn bad_paths_are_rejected_as_json() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;

		for (method, uri) in [
			(Method::PATCH, "/users/2/permissions/CAN_FLY"),
			(Method::GET, "/users/abc/permissions"),
		] {
			let response = crate::router(state)
				.oneshot(request(method, uri, token.as_str(), None)?)
				.await?;

			assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

			let body = to_bytes(response.into_body(), usize::MAX).await?;
			let json = serde_json::from_slice::<serde_json::Value>(&body)?;

			assert!(json["message"].is_string(), "{uri}: no JSON error message");
		}

		Ok(())
	}
}
