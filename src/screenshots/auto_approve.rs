//! Automatic promotion of prolific screenshot submitters.
//!
//! Once a user has enough approved screenshots, their future uploads skip moderation. This is a
//! one-way ratchet: nothing here ever revokes [`PermissionKind::AutoApproveScreenshot`], only an
//! administrator can.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::AutoApproveConfig;
use crate::permissions::{PermissionKind, PermissionStore};
use crate::users::UserID;

/// Grants [`PermissionKind::AutoApproveScreenshot`] once a user crosses the configured threshold
/// of approved screenshots.
#[derive(Clone)]
pub struct AutoApprover {
	/// Where to record the grant.
	store: Arc<dyn PermissionStore>,

	/// How many approved screenshots a user needs.
	threshold: u64,
}

impl fmt::Debug for AutoApprover {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AutoApprover")
			.field("threshold", &self.threshold)
			.finish_non_exhaustive()
	}
}

impl AutoApprover {
	/// Creates a new [`AutoApprover`].
	pub fn new(store: Arc<dyn PermissionStore>, config: &AutoApproveConfig) -> Self {
		Self {
			store,
			threshold: config.threshold,
		}
	}

	/// The number of approved screenshots required for the grant.
	pub const fn threshold(&self) -> u64 {
		self.threshold
	}

	/// Reacts to one of `user_id`'s screenshots being approved.
	///
	/// `approved_count` is the number of screenshots of that user which are approved, including
	/// the one that triggered this call.
	///
	/// The screenshot has already been approved by the time this runs, so failures are logged
	/// and otherwise ignored.
	#[tracing::instrument(
		level = "debug",
		name = "screenshots::auto_approve",
		skip(self),
		fields(threshold = self.threshold),
	)]
	pub async fn on_screenshot_approved(&self, user_id: UserID, approved_count: u64) {
		if approved_count < self.threshold {
			return;
		}

		match self
			.store
			.grant(user_id, PermissionKind::AutoApproveScreenshot)
			.await
		{
			Ok(()) => {
				tracing::info! {
					target: "delfruit_api::audit_log",
					%user_id,
					approved_count,
					"granted automatic screenshot approval",
				};
			}
			Err(error) => {
				tracing::error! {
					target: "delfruit_api::audit_log",
					%user_id,
					approved_count,
					?error,
					"failed to grant automatic screenshot approval",
				};
			}
		}
	}

	/// Runs [`AutoApprover::on_screenshot_approved()`] in the background.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(&self, user_id: UserID, approved_count: u64) -> JoinHandle<()> {
		let approver = self.clone();

		tokio::spawn(async move {
			approver
				.on_screenshot_approved(user_id, approved_count)
				.await;
		})
	}
}
