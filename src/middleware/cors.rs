//! CORS middlewares.

use axum::http::{header, Method};
use tower_http::cors::CorsLayer;

use crate::authentication::refresh::TOKEN_HEADER;

/// Creates a permissive CORS layer.
///
/// Browsers may call every route from any origin, and scripts may read the `token` header that
/// carries refreshed tokens.
pub fn permissive() -> CorsLayer {
	CorsLayer::permissive()
		.allow_methods([Method::GET, Method::POST, Method::PATCH])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
		.expose_headers([TOKEN_HEADER])
}
