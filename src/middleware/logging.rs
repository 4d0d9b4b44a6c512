//! This module contains configuration for the [`Trace`] middleware from
//! [`tower_http`].
//!
//! Every request gets a span with a unique ID. Once the response is ready, the span records the
//! status, the latency, the authenticated user (if any), and whether a refreshed token was
//! attached.
//!
//! The configured layer contains unique function types, and as such cannot be spelled out in
//! code. This is why we export a macro instead, which will just expand to the final expression.
//! The `pub(crate)` functions in this module are `#[doc(hidden)]`; only the macro should call
//! them.
//!
//! [`Trace`]: tower_http::trace::Trace

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::response::Response;
use tower_http::classify::ServerErrorsFailureClass;
use uuid::Uuid;

use crate::authentication::refresh::TOKEN_HEADER;
use crate::users::UserID;

/// Creates a middleware that will log incoming HTTP requests.
macro_rules! layer {
	() => {
		tower_http::trace::TraceLayer::new_for_http()
			.make_span_with($crate::middleware::logging::make_span)
			.on_response($crate::middleware::logging::on_response)
			.on_failure($crate::middleware::logging::on_failure)
	};
}

pub(crate) use layer;

#[doc(hidden)]
pub(crate) fn make_span(request: &Request) -> tracing::Span {
	let ip = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map_or_else(|| String::from("N/A"), |ConnectInfo(addr)| addr.to_string());

	tracing::info_span! {
		target: "delfruit_api::http",
		"request",
		request.id = %Uuid::now_v7(),
		request.ip = %ip,
		request.method = %request.method(),
		request.uri = %request.uri(),
		user.id = tracing::field::Empty,
		response.status = tracing::field::Empty,
		response.refreshed = tracing::field::Empty,
		latency = tracing::field::Empty,
	}
}

/// The authenticated user is recorded by the token middleware as a response extension.
#[doc(hidden)]
pub(crate) fn on_response(response: &Response, latency: Duration, span: &tracing::Span) {
	if let Some(user_id) = response.extensions().get::<UserID>() {
		span.record("user.id", format_args!("{user_id}"));
	}

	span.record("response.status", format_args!("{}", response.status()))
		.record("response.refreshed", response.headers().contains_key(TOKEN_HEADER))
		.record("latency", format_args!("{latency:?}"));

	tracing::debug!(target: "delfruit_api::http", "sending response");
}

#[doc(hidden)]
pub(crate) fn on_failure(failure: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span) {
	let status = match failure {
		ServerErrorsFailureClass::Error(error) => {
			tracing::error!(target: "delfruit_api::audit_log", %error, ?latency, "request failed");
			return;
		}
		ServerErrorsFailureClass::StatusCode(status) => status,
	};

	if status.is_server_error() {
		tracing::error!(target: "delfruit_api::audit_log", %status, ?latency, "request failed");
	} else {
		tracing::debug!(target: "delfruit_api::audit_log", %status, ?latency, "request failed");
	}
}
