//! HTTP plumbing for the storefront backend.
//!
//! This module provides:
//! - `OutboundRequest` / `HttpResponse`: transport-neutral request and response values
//! - `Transport`: the async seam every request goes through
//! - `HttpTransport`: the `reqwest` implementation bound to one backend origin
//! - The error taxonomy shared by the session layer

pub mod client;
pub mod error;
pub mod transport;

pub use client::HttpTransport;
pub use error::{ApiError, AuthError, DispatchError, RefreshError, TransportError};
pub use transport::{HttpResponse, OutboundRequest, RequestBody, Transport};
