//! Wrappers around axum's extractors that reject with [`Error`] instead of plain text.
//!
//! [`Error`]: crate::Error

use axum::extract::{FromRequest, FromRequestParts};

use crate::Error;

/// An extractor for URI segment captures.
///
/// This wraps [`axum::extract::Path`] exactly, but rejects with a JSON error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// An extractor for JSON request bodies.
///
/// This wraps [`axum::Json`] exactly, but rejects with a JSON error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);
