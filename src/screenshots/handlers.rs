//! HTTP handlers for the `/screenshots` routes.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::authorization::{Admin, Authorized};
use crate::extract;
use crate::users::UserID;

/// Request body for [`approved()`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotApproved {
	/// The user who uploaded the screenshot.
	pub user_id: UserID,

	/// How many of that user's screenshots are approved now, including this one.
	pub approved_count: u64,
}

/// Response body for [`approved()`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
	/// The configured threshold.
	pub threshold: u64,

	/// Whether the user qualifies for automatic approval.
	pub auto_approve: bool,
}

/// Notifies the API that a moderator approved a screenshot.
///
/// The screenshot itself is already approved, so this never fails because of the permission
/// store; see [`AutoApprover::on_screenshot_approved()`].
///
/// [`AutoApprover::on_screenshot_approved()`]: super::AutoApprover::on_screenshot_approved
#[tracing::instrument(level = "debug", skip_all, fields(admin.id = %admin.user_id()))]
pub async fn approved(
	admin: Authorized<Admin>,
	State(state): State<&'static crate::State>,
	extract::Json(event): extract::Json<ScreenshotApproved>,
) -> Json<ApprovalOutcome> {
	let approver = &state.auto_approver;

	approver
		.on_screenshot_approved(event.user_id, event.approved_count)
		.await;

	Json(ApprovalOutcome {
		threshold: approver.threshold(),
		auto_approve: event.approved_count >= approver.threshold(),
	})
}

#[cfg(test)]
mod tests {
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Request, StatusCode};
	use chrono::Utc;
	use serde_json::json;
	use tower::ServiceExt;

	use crate::permissions::PermissionKind;
	use crate::test;
	use crate::users::UserID;

	fn request(token: &str, body: &serde_json::Value) -> anyhow::Result<Request<Body>> {
		Ok(Request::post("/screenshots/approved")
			.header(header::AUTHORIZATION, format!("Bearer {token}"))
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(serde_json::to_vec(body)?))?)
	}

	#[tokio::test]
	async fn tenth_approval_grants_auto_approve() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;

		for count in [9, 10] {
			let response = crate::router(state)
				.oneshot(request(
					token.as_str(),
					&json!({ "userId": 5, "approvedCount": count }),
				)?)
				.await?;

			assert_eq!(response.status(), StatusCode::OK, "status");

			let body = to_bytes(response.into_body(), usize::MAX).await?;
			let outcome = serde_json::from_slice::<serde_json::Value>(&body)?;

			assert_eq!(outcome["autoApprove"], count >= 10, "outcome for {count}");
			assert_eq!(
				state
					.permissions
					.is_active(UserID(5), PermissionKind::AutoApproveScreenshot, Utc::now())
					.await?,
				count >= 10,
				"stored permission for {count}",
			);
		}

		Ok(())
	}

	#[tokio::test]
	async fn only_admins_report_approvals() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(5), "kid", false)?;
		let response = crate::router(state)
			.oneshot(request(
				token.as_str(),
				&json!({ "userId": 5, "approvedCount": 50 }),
			)?)
			.await?;

		assert_eq!(response.status(), StatusCode::FORBIDDEN, "status");
		assert!(
			!state
				.permissions
				.is_active(UserID(5), PermissionKind::AutoApproveScreenshot, Utc::now())
				.await?,
			"permission was granted",
		);

		Ok(())
	}

	#[tokio::test]
	async fn malformed_events_are_rejected_as_json() -> anyhow::Result<()> {
		let state = test::state();
		let token = state.tokens.issue(UserID(1), "boshy", true)?;
		let response = crate::router(state)
			.oneshot(request(token.as_str(), &json!({ "userId": "five" }))?)
			.await?;

		assert!(response.status().is_client_error(), "status");

		let body = to_bytes(response.into_body(), usize::MAX).await?;
		let json = serde_json::from_slice::<serde_json::Value>(&body)?;

		assert!(json["message"].is_string(), "no JSON error message");

		Ok(())
	}
}
