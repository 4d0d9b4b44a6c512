#![doc = include_str!("../README.md")]
// TODO: remove once https://github.com/tokio-rs/tracing/issues/2912 lands
#![allow(clippy::blocks_in_conditions)]

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::extract::ConnectInfo;
use axum::{routing, Router};
use tokio::net::TcpListener;
use tokio::signal;

mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::Config;

mod state;
pub use state::State;

#[cfg(test)]
mod test;

pub mod middleware;
pub mod extract;
pub mod users;
pub mod authentication;
pub mod authorization;
pub mod permissions;
pub mod screenshots;

#[allow(clippy::missing_docs_in_private_items)]
type Server = axum::serve::Serve<
	IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
	axum::middleware::AddExtension<Router, ConnectInfo<SocketAddr>>,
>;

/// Run the API.
///
/// This function will not exit until a SIGINT signal is received.
/// If you want to supply a custom signal for graceful shutdown, use [`run_until()`] instead.
pub async fn run(config: Config) -> anyhow::Result<()> {
	server(config)
		.await
		.context("build http server")?
		.with_graceful_shutdown(sigint())
		.await
		.context("run http server")
}

/// Run the API until a given future completes.
///
/// This function is the same as [`run()`], except that it also waits for the provided `until`
/// future, and shuts down the server when that future resolves.
pub async fn run_until<Until>(config: Config, until: Until) -> anyhow::Result<()>
where
	Until: Future<Output = ()> + Send + 'static,
{
	server(config)
		.await
		.context("build http server")?
		.with_graceful_shutdown(async move {
			tokio::select! {
				() = until => {}
				() = sigint() => {}
			}
		})
		.await
		.context("run http server")
}

/// Returns the API's full router, including middleware.
///
/// Every request passes through the token middleware, which authenticates the bearer token (if
/// any) and attaches refreshed tokens to responses.
pub fn router(state: &'static State) -> Router {
	Router::new()
		.route("/", routing::get(|| async { "(ﾉ◕ヮ◕)ﾉ*:･ﾟ✧" }))
		.nest("/auth", authentication::router(state))
		.nest("/users", permissions::router(state))
		.nest("/screenshots", screenshots::router(state))
		.layer(authentication::TokenLayer::new(state.tokens.clone()))
		.layer(middleware::cors::permissive())
		.layer(middleware::logging::layer!())
}

/// Runs the necessary setup for the API and returns a future that will run the server when polled.
///
/// See [`run()`] and [`run_until()`].
async fn server(config: Config) -> anyhow::Result<Server> {
	tracing::debug!(addr = %config.addr, "establishing TCP connection");

	let tcp_listener = TcpListener::bind(config.addr)
		.await
		.context("bind tcp socket")?;

	let addr = tcp_listener.local_addr().context("get tcp addr")?;
	tracing::info!(%addr, prod = cfg!(feature = "production"), "listening for requests");

	let state = State::new(config).await.context("initialize state")?;

	tracing::debug!(?state, "initializing API service");

	let api_service = router(state).into_make_service_with_connect_info::<SocketAddr>();

	Ok(axum::serve(tcp_listener, api_service))
}

/// Waits for a SIGINT signal from the operating system.
#[tracing::instrument(name = "runtime::signals")]
async fn sigint() {
	let signal_result = signal::ctrl_c().await;

	if let Err(err) = signal_result {
		tracing::error!(target: "delfruit_api::audit_log", "failed to receive SIGINT: {err}");
	} else {
		tracing::warn!(target: "delfruit_api::audit_log", "received SIGINT; shutting down...");
	}
}

#[cfg(test)]
mod tests {
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Request, StatusCode};
	use tower::ServiceExt;

	use crate::authentication::refresh::TOKEN_HEADER;
	use crate::test;

	#[tokio::test]
	async fn hello_world() -> anyhow::Result<()> {
		let response = crate::router(test::state())
			.oneshot(Request::get("/").body(Body::empty())?)
			.await?;

		assert_eq!(response.status(), StatusCode::OK, "status");

		let body = to_bytes(response.into_body(), usize::MAX).await?;

		assert_eq!(body, "(ﾉ◕ヮ◕)ﾉ*:･ﾟ✧", "body");

		Ok(())
	}

	#[tokio::test]
	async fn cors_exposes_refreshed_tokens() -> anyhow::Result<()> {
		let response = crate::router(test::state())
			.oneshot(
				Request::get("/")
					.header(header::ORIGIN, "https://delicious-fruit.com")
					.body(Body::empty())?,
			)
			.await?;

		let exposed = response
			.headers()
			.get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
			.map(|value| value.to_str())
			.transpose()?
			.unwrap_or_default();

		assert!(exposed.contains(TOKEN_HEADER.as_str()), "`token` header is not exposed");

		Ok(())
	}

	#[tokio::test]
	async fn invalid_tokens_are_rejected_everywhere() -> anyhow::Result<()> {
		let response = crate::router(test::state())
			.oneshot(
				Request::get("/")
					.header(header::AUTHORIZATION, "Bearer not-a-token")
					.body(Body::empty())?,
			)
			.await?;

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "status");

		Ok(())
	}
}
