//! This module contains general purpose middleware.
//!
//! Middlewares are implemented as [tower services].
//! This means they can integrate with [`axum`], our HTTP framework, but are
//! also re-usable independently of that.
//!
//! Token authentication lives in [`crate::authentication::middleware`].
//!
//! [tower services]: tower::Service

pub(crate) mod logging;
pub(crate) mod cors;
